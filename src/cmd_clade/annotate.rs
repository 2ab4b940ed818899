use super::utils;
use clade::libs::metadata::{taxon_key, MetadataIndex};
use clade::libs::phylo::{AttrValue, TreeError};
use clap::*;
use std::collections::HashSet;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("annotate")
        .about("Copy metadata columns onto tips")
        .after_help(
            r###"
Looks up every tip in a metadata table and stores the requested columns
as tip attributes. The attributes are written as NHX comments, or as
BEAST comments with `--format nexus`.

Notes:
* The table is CSV for `.csv` files and TSV otherwise, with a header row.
* Tips are matched on the `--index` column. `--field` picks one field of
  the tip name, split on `--delimiter`, as the key.
* Numeric cells become numbers; everything else is kept as text.
* Empty cells are not copied.
* `--label COL` appends the value of COL to the tip name, after
  `--delimiter`. Several `--label` columns are appended in order.
* `--replace` clears the existing tip attributes first, and makes
  `--label` replace the tip name instead of extending it.
* Renamed tips must stay unique.
* A tip without a metadata record stops the command, unless
  `--ignore-missing` is set; then it is left alone and counted.

Examples:
1. Attach lineages:
   clade annotate tree.nwk metadata.csv --attr lineage

2. Keys are the second field of `name|EPI_ISL_1|2021-01-01`:
   clade annotate tree.nwk meta.tsv --index accession --field 2 \
       --attr lineage --attr country

3. Tip names become `<sample>|<country>`:
   clade annotate tree.nwk metadata.csv --replace --label sample --label country

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
            Arg::new("metadata")
                .required(true)
                .num_args(1)
                .index(2)
                .help("Metadata table, CSV or TSV"),
        )
        .arg(
            Arg::new("attr")
                .long("attr")
                .short('a')
                .num_args(1)
                .action(ArgAction::Append)
                .help("Column to copy onto tips. Default is every column but the index"),
        )
        .arg(
            Arg::new("label")
                .long("label")
                .num_args(1)
                .action(ArgAction::Append)
                .help("Column to add to tip names"),
        )
        .arg(
            Arg::new("replace")
                .long("replace")
                .action(ArgAction::SetTrue)
                .help("Replace existing tip attributes and names"),
        )
        .arg(utils::arg_ignore_missing());

    utils::args_metadata(cmd)
        .arg(utils::arg_format())
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    let infile = args.get_one::<String>("infile").unwrap();
    let format = utils::output_format(args)?;

    let table = utils::load_table(args.get_one::<String>("metadata").unwrap(), args)?;

    let attrs: Vec<String> = match args.get_many::<String>("attr") {
        Some(values) => values.cloned().collect(),
        None => table
            .columns()
            .iter()
            .filter(|c| *c != table.index_column())
            .cloned()
            .collect(),
    };
    for attr in &attrs {
        if !table.columns().contains(attr) {
            return Err(anyhow::anyhow!("Column, {}, not found in metadata", attr));
        }
    }

    let labels: Vec<String> = match args.get_many::<String>("label") {
        Some(values) => values.cloned().collect(),
        None => Vec::new(),
    };
    for label in &labels {
        if !table.columns().contains(label) {
            return Err(anyhow::anyhow!("Column, {}, not found in metadata", label));
        }
    }

    let is_replace = args.get_flag("replace");
    let is_ignore = args.get_flag("ignore_missing");
    let field = *args.get_one::<usize>("field").unwrap();
    let delimiter = *args.get_one::<char>("delimiter").unwrap();

    //----------------------------
    // Operating
    //----------------------------
    let mut trees = utils::read_trees(infile)?;
    for tree in trees.iter_mut() {
        if is_replace {
            for id in tree.get_leaves() {
                tree.node_mut(id)?.attributes.clear();
            }
        }

        let mut unmatched = 0;
        let mut renames = Vec::new();
        for id in tree.get_leaves() {
            let name = match tree.get_node(id).and_then(|n| n.name.clone()) {
                Some(name) => name,
                None => continue,
            };
            let key = taxon_key(&name, field, delimiter).unwrap_or_default();
            let record = match table.lookup(key) {
                Some(record) => record,
                None if is_ignore => {
                    unmatched += 1;
                    continue;
                }
                None => {
                    return Err(anyhow::anyhow!(
                        "Tip index, {}, not found in metadata table",
                        key
                    ))
                }
            };

            let node = tree.node_mut(id)?;
            for attr in &attrs {
                if let Some(value) = record.get(attr) {
                    node.set_attribute(attr.as_str(), AttrValue::parse(value));
                }
            }

            if !labels.is_empty() {
                let mut parts: Vec<&str> = Vec::new();
                if !is_replace {
                    parts.push(&name);
                }
                parts.extend(labels.iter().map(|l| record.get(l).unwrap_or_default()));
                renames.push((id, parts.join(&delimiter.to_string())));
            }
        }

        if unmatched > 0 {
            log::warn!("{} tip(s) have no metadata record", unmatched);
        }

        // Checked in full before any tip is renamed
        let renamed: HashSet<_> = renames.iter().map(|(id, _)| *id).collect();
        let mut taken: HashSet<String> = tree
            .get_leaves()
            .into_iter()
            .filter(|id| !renamed.contains(id))
            .filter_map(|id| tree.get_node(id).and_then(|n| n.name.clone()))
            .collect();
        for (_, new_name) in &renames {
            if !taken.insert(new_name.clone()) {
                return Err(TreeError::DuplicateTaxon(new_name.clone()).into());
            }
        }
        for (id, new_name) in renames {
            tree.node_mut(id)?.set_name(&new_name);
        }
    }

    //----------------------------
    // Output
    //----------------------------
    utils::write_trees(&mut writer, &trees, format)?;

    Ok(())
}
