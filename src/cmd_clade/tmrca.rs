use super::utils;
use clade::libs::phylo::MissingPolicy;
use clap::*;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("tmrca")
        .about("Height of the most recent common ancestor of taxa")
        .after_help(
            r###"
Finds the most recent common ancestor (MRCA) of the named taxa and writes
its height: the distance from it to its farthest descendant tip. In a
time tree this is the age of the ancestor.

Notes:
* Taxa are named with `--node`, `--file` and `--regex`.
* `--stem` reports the height of the MRCA's parent instead, i.e. the
  top of the branch leading to the clade. At the root it falls back to
  the root itself.
* Output is TSV: the 1-based tree number and the height.

Examples:
1. clade tmrca tree.nwk -n A -n B

2. Stem age of a lineage, for each tree of a posterior sample:
   clade tmrca posterior.trees -r "^B\.1\.1\.7" --stem

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
            Arg::new("stem")
                .long("stem")
                .action(ArgAction::SetTrue)
                .help("Report the height of the MRCA's parent"),
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

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());
    let infile = args.get_one::<String>("infile").unwrap();
    let policy = MissingPolicy::from_ignore(args.get_flag("ignore_missing"));
    let is_stem = args.get_flag("stem");

    let trees = utils::read_trees(infile)?;

    //----------------------------
    // Output
    //----------------------------
    writer.write_fmt(format_args!("tree\ttmrca\n"))?;
    for (i, tree) in trees.iter().enumerate() {
        let (names, _) = utils::match_names(tree, args, policy)?;
        let (ids, _) = tree.resolve_taxa(&names, MissingPolicy::Fail)?;
        if ids.is_empty() {
            return Err(anyhow::anyhow!("No taxa matched in tree {}", i + 1));
        }

        let height = tree.tmrca(&ids, is_stem)?;
        writer.write_fmt(format_args!("{}\t{}\n", i + 1, height))?;
    }

    Ok(())
}
