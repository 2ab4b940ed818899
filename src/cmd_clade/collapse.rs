use super::utils;
use clap::*;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("collapse")
        .about("Contract internal branches shorter than a threshold")
        .after_help(
            r###"
Contracts every internal branch whose length is strictly less than the
threshold. The children of a contracted node join its parent, forming a
polytomy; the contracted branch itself is dropped.

Notes:
* Tips and the root are never contracted.
* A missing branch length counts as 0.
* The threshold must be positive; use a tiny one such as 1e-9 to drop
  zero-length branches.

Examples:
1. Remove zero-length branches:
   clade collapse input.nwk -t 1e-9

2. Collapse branches shorter than 0.001 and write Nexus:
   clade collapse input.nwk -t 0.001 --format nexus -o out.nexus

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
            Arg::new("threshold")
                .long("threshold")
                .short('t')
                .required(true)
                .num_args(1)
                .value_parser(value_parser!(f64))
                .help("Branches shorter than this are contracted"),
        )
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
    let threshold = *args.get_one::<f64>("threshold").unwrap();
    let format = utils::output_format(args)?;

    //----------------------------
    // Operating
    //----------------------------
    let mut trees = utils::read_trees(infile)?;
    for tree in trees.iter_mut() {
        let n = tree.collapse_below(threshold)?;
        log::info!("Contracted {} branch(es) shorter than {}", n, threshold);
    }

    //----------------------------
    // Output
    //----------------------------
    utils::write_trees(&mut writer, &trees, format)?;

    Ok(())
}
