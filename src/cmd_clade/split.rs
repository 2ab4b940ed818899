use super::utils;
use clade::libs::phylo::tree::io::{self, Format};
use clade::libs::phylo::AttrValue;
use clap::*;
use std::io::Write;
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("split")
        .about("Split into monophyletic subtrees by a tip attribute")
        .after_help(
            r###"
Groups tips by their value of `--attr` and finds, for every value, the
largest clades whose tips all share it. Each such clade is written to its
own file, `<outdir>/<prefix><value>.nwk` (or `.nexus`). A value whose
tips are scattered over the tree yields several clades, written to the
same file, one tree per line.

Notes:
* Tip values come from tip attributes, e.g. after `clade annotate`, or
  straight from a metadata table with `--metadata`.
* With `--hierarchical`, values are dot-separated lineages and a lineage
  also covers its sublineages: B.1 covers B.1.1.7 but not B.11. Clades of
  B.1 then include tips of B.1.1.7.
* Every clade node is tagged under `--out-attr`; tags accumulate into a
  set, e.g. `{B.1,B.1.1}`. `-o` writes the tagged tree.
* A clade of one tip is written as a one-node tree.
* `/` in values is replaced by `_` in file names.
* With several input trees, each is split on its own and its files are
  named `<prefix>tree<N>_<value>`, N counting from 1.

Examples:
1. One file per lineage:
   clade split tree.nwk --attr lineage --outdir clades/

2. Lineages from metadata, nested:
   clade split tree.nwk --metadata meta.csv --attr lineage --hierarchical \
       --prefix lineage_ --outdir clades/ -o tagged.nwk

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Input filename. [stdin] for standard input"),
        )
        .arg(
            Arg::new("attr")
                .long("attr")
                .short('a')
                .required(true)
                .num_args(1)
                .help("Tip attribute (or metadata column) to split on"),
        )
        .arg(
            Arg::new("metadata")
                .long("metadata")
                .short('m')
                .num_args(1)
                .help("Read tip values from this metadata table"),
        )
        .arg(
            Arg::new("hierarchical")
                .long("hierarchical")
                .action(ArgAction::SetTrue)
                .help("Treat values as dot-separated lineages"),
        )
        .arg(
            Arg::new("out_attr")
                .long("out-attr")
                .num_args(1)
                .default_value("clade")
                .help("Attribute holding the clade tags"),
        );

    utils::args_metadata(cmd)
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .short('d')
                .num_args(1)
                .default_value(".")
                .help("Output directory for the clade files"),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .num_args(1)
                .default_value("")
                .help("Prefix of the clade file names"),
        )
        .arg(utils::arg_format())
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .num_args(1)
                .help("Write the tagged trees to this file"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("infile").unwrap();
    let attr = args.get_one::<String>("attr").unwrap();
    let out_attr = args.get_one::<String>("out_attr").unwrap();
    let is_hierarchical = args.get_flag("hierarchical");
    let outdir = args.get_one::<String>("outdir").unwrap();
    let prefix = args.get_one::<String>("prefix").unwrap();
    let format = utils::output_format(args)?;

    let table = match args.get_one::<String>("metadata") {
        Some(metadata) => {
            let table = utils::load_table(metadata, args)?;
            if !table.columns().contains(attr) {
                return Err(anyhow::anyhow!("Column, {}, not found in metadata", attr));
            }
            Some(table)
        }
        None => None,
    };

    let extension = match format {
        Format::Newick => "nwk",
        Format::Nexus => "nexus",
    };
    std::fs::create_dir_all(outdir)?;

    let mut trees = utils::read_trees(infile)?;
    if trees.is_empty() {
        return Err(anyhow::anyhow!("No tree in {}", infile));
    }
    let is_multi = trees.len() > 1;

    for (i, tree) in trees.iter_mut().enumerate() {
        if let Some(table) = &table {
            for id in tree.get_leaves() {
                let name = tree.node(id)?.name.clone().unwrap_or_default();
                let value = utils::record_of(table, &name, args).and_then(|r| r.get(attr));
                if let Some(value) = value {
                    tree.node_mut(id)?
                        .set_attribute(attr.as_str(), AttrValue::Text(value.to_string()));
                }
            }
        }

        //----------------------------
        // Operating
        //----------------------------
        let values = tree.annotate_all(attr, is_hierarchical, out_attr)?;
        log::info!("{} distinct value(s) of {}", values.len(), attr);

        //----------------------------
        // Output
        //----------------------------
        let file_prefix = if is_multi {
            format!("{}tree{}_", prefix, i + 1)
        } else {
            prefix.to_string()
        };

        for value in &values {
            let parts = tree.split_by_value(out_attr, value)?;
            if parts.is_empty() {
                continue;
            }
            log::info!("{}: {} clade(s)", value, parts.len());

            let filename = format!("{}{}.{}", file_prefix, value.replace('/', "_"), extension);
            let path = Path::new(outdir).join(filename);
            let mut writer = intspan::writer(&path.to_string_lossy());
            writer.write_all(io::write_trees(&parts, format).as_bytes())?;
        }
    }

    if let Some(outfile) = args.get_one::<String>("outfile") {
        let mut writer = intspan::writer(outfile);
        utils::write_trees(&mut writer, &trees, format)?;
    }

    Ok(())
}
