use super::utils;
use clade::libs::phylo::MissingPolicy;
use clap::*;
use itertools::Itertools;
use std::collections::{BTreeSet, HashSet};
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("extract")
        .about("Write tip attributes as CSV")
        .after_help(
            r###"
Writes one CSV row per tip: the taxon name followed by the requested
attributes. Tips of every input tree are listed, tree by tree.

Notes:
* Without `--attr`, every attribute found on any tip is written, sorted
  by name.
* Missing attributes are written as empty cells.
* Tag sets are written as `{a,b}`.
* `--node`, `--file` and `--regex` restrict the rows to those taxa. A named
  taxon not in a tree stops the command, unless `--ignore-missing` is set.

Examples:
1. All attributes:
   clade extract annotated.nwk

2. Only the clade assignment of `clade split`:
   clade extract split.nwk --attr clade -o clades.csv

3. Two taxa:
   clade extract annotated.nwk -n A -n B

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
                .num_args(1)
                .action(ArgAction::Append)
                .help("Attribute to write"),
        )
        .arg(utils::arg_ignore_missing());

    utils::args_names(cmd).arg(
        Arg::new("outfile")
            .short('o')
            .long("outfile")
            .num_args(1)
            .default_value("stdout")
            .help("Output filename. [stdout] for screen"),
    )
}

fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    let infile = args.get_one::<String>("infile").unwrap();
    let policy = MissingPolicy::from_ignore(args.get_flag("ignore_missing"));
    let is_restricted = ["node", "file", "regex"]
        .iter()
        .any(|id| args.contains_id(id));

    let trees = utils::read_trees(infile)?;

    let attrs: Vec<String> = match args.get_many::<String>("attr") {
        Some(values) => values.cloned().collect(),
        None => {
            let mut keys = BTreeSet::new();
            for tree in &trees {
                for id in tree.get_leaves() {
                    if let Some(node) = tree.get_node(id) {
                        keys.extend(node.attributes.keys().cloned());
                    }
                }
            }
            keys.into_iter().collect()
        }
    };

    //----------------------------
    // Output
    //----------------------------
    let header = std::iter::once("taxon".to_string())
        .chain(attrs.iter().cloned())
        .map(|s| csv_cell(&s))
        .join(",");
    writer.write_fmt(format_args!("{}\n", header))?;

    for tree in &trees {
        let selected: Option<HashSet<String>> = if is_restricted {
            let (names, _) = utils::match_names(tree, args, policy)?;
            Some(names.into_iter().collect())
        } else {
            None
        };

        for id in tree.get_leaves() {
            let node = tree.node(id)?;
            let name = node.name.clone().unwrap_or_default();
            if selected.as_ref().is_some_and(|s| !s.contains(&name)) {
                continue;
            }
            let row = std::iter::once(name)
                .chain(attrs.iter().map(|attr| {
                    node.get_attribute(attr)
                        .map(|v| v.to_string())
                        .unwrap_or_default()
                }))
                .map(|s| csv_cell(&s))
                .join(",");
            writer.write_fmt(format_args!("{}\n", row))?;
        }
    }

    Ok(())
}
