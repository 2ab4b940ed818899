use super::utils;
use clap::*;
use itertools::Itertools;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("stat")
        .about("Tree statistics")
        .after_help(
            r###"
Reports, per tree: node and tip counts, whether the tree is binary and
ultrametric, the root height, root-to-tip distances, the number of
levels and the total branch length.

Notes:
* `--style col` writes one `key<TAB>value` block per tree.
* `--style line` writes a header and one row per tree.
* A tree is ultrametric when all root-to-tip distances agree within 1e-4.

Examples:
1. clade stat tree.nwk

2. One line per tree, e.g. for a posterior sample:
   clade stat posterior.trees --style line

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
            Arg::new("style")
                .long("style")
                .num_args(1)
                .value_parser([
                    builder::PossibleValue::new("col"),
                    builder::PossibleValue::new("line"),
                ])
                .default_value("col")
                .help("Layout of the output"),
        )
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
    let is_line = args.get_one::<String>("style").unwrap() == "line";

    let trees = utils::read_trees(infile)?;

    //----------------------------
    // Output
    //----------------------------
    for (i, tree) in trees.iter().enumerate() {
        let stats = tree.stats()?;

        if is_line {
            if i == 0 {
                let header = stats.rows().iter().map(|(k, _)| *k).join("\t");
                writer.write_fmt(format_args!("{}\n", header))?;
            }
            let row = stats.rows().into_iter().map(|(_, v)| v).join("\t");
            writer.write_fmt(format_args!("{}\n", row))?;
        } else {
            writer.write_all(stats.to_tsv().as_bytes())?;
        }
    }

    Ok(())
}
