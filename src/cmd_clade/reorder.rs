use super::utils;
use clade::libs::phylo::tree::Order;
use clap::*;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("reorder")
        .about("Sort the children of every node by clade size")
        .after_help(
            r###"
Sorts the children of every internal node by the number of tips below
them. Ties keep their input order. Topology and branch lengths are not
changed, only the order in which clades are written.

Examples:
1. Small clades first (ladderize up):
   clade reorder tree.nwk

2. Large clades first:
   clade reorder tree.nwk --order decreasing

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
            Arg::new("order")
                .long("order")
                .num_args(1)
                .value_parser([
                    builder::PossibleValue::new("increasing"),
                    builder::PossibleValue::new("decreasing"),
                ])
                .default_value("increasing")
                .help("Sort direction of clade sizes"),
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
    let format = utils::output_format(args)?;
    let order = match args.get_one::<String>("order").unwrap().as_str() {
        "decreasing" => Order::Decreasing,
        _ => Order::Increasing,
    };

    //----------------------------
    // Operating
    //----------------------------
    let mut trees = utils::read_trees(infile)?;
    for tree in trees.iter_mut() {
        tree.reorder(order);
    }

    //----------------------------
    // Output
    //----------------------------
    utils::write_trees(&mut writer, &trees, format)?;

    Ok(())
}
