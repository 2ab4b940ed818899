use super::utils;
use clade::libs::metadata::MetadataIndex;
use clade::libs::phylo::MissingPolicy;
use clap::*;
use std::collections::BTreeMap;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("insert")
        .about("Add new tips next to existing tips")
        .after_help(
            r###"
Places new taxa beside existing ones. Each metadata row whose key is not
yet in the tree names its destination, an existing tip, in the `--dest`
column. A new internal node takes over the destination's branch; the
destination and the new taxa hang below it on zero-length branches.

Notes:
* Rows whose key is already a tip are left alone.
* Rows with an empty `--dest` cell are left alone.
* A destination that is not a tip stops the command, unless
  `--ignore-missing` is set; then its rows are skipped and counted.
* The tree is checked completely before any tip is inserted.

Examples:
1. Place new samples next to their closest sequenced relative:
   clade insert tree.nwk placements.tsv --dest closest

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
            Arg::new("dest")
                .long("dest")
                .short('d')
                .required(true)
                .num_args(1)
                .help("Column naming the destination tip"),
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
    let policy = MissingPolicy::from_ignore(args.get_flag("ignore_missing"));

    let table = utils::load_table(args.get_one::<String>("metadata").unwrap(), args)?;
    let dest = args.get_one::<String>("dest").unwrap();
    if !table.columns().contains(dest) {
        return Err(anyhow::anyhow!("Column, {}, not found in metadata", dest));
    }

    //----------------------------
    // Operating
    //----------------------------
    let mut trees = utils::read_trees(infile)?;
    for tree in trees.iter_mut() {
        let present = tree.get_leaf_name_set();

        let mut insertions: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for key in table.keys() {
            if present.contains(key) {
                continue;
            }
            let destination = match table.lookup(key).and_then(|r| r.get(dest)) {
                Some(d) => d,
                None => continue,
            };
            insertions
                .entry(destination.to_string())
                .or_default()
                .push(key.to_string());
        }

        let report = tree.insert_tips(&insertions, policy)?;
        log::info!(
            "Inserted {} tip(s) at {} destination(s)",
            report.inserted,
            report.destinations
        );
        if report.skipped > 0 {
            log::warn!(
                "{} taxa skipped, their destinations are not in the tree",
                report.skipped
            );
        }
    }

    //----------------------------
    // Output
    //----------------------------
    utils::write_trees(&mut writer, &trees, format)?;

    Ok(())
}
