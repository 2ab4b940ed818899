use super::utils;
use clade::libs::phylo::tree::io::Format;
use clap::*;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("convert")
        .about("Convert trees between Newick and Nexus")
        .after_help(
            r###"
Reads Newick or Nexus (detected by the `#NEXUS` header) and writes the
trees in the chosen format.

Notes:
* Node attributes are written as NHX comments in Newick, `[&&NHX:k=v]`,
  and as BEAST comments in Nexus, `[&k=v,k2={a,b}]`.
* Nexus output names tips through a Translate table.
* `--indent` pretty-prints Newick output, one node per line.

Examples:
1. Newick to Nexus:
   clade convert input.nwk --format nexus -o out.nexus

2. Nexus (e.g. from BEAST) to indented Newick:
   clade convert mcc.tree --indent "  "

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Input filename. [stdin] for standard input"),
        )
        .arg(utils::arg_format())
        .arg(
            Arg::new("indent")
                .long("indent")
                .num_args(1)
                .help("Indentation for Newick output"),
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
    let format = utils::output_format(args)?;

    let trees = utils::read_trees(infile)?;

    //----------------------------
    // Output
    //----------------------------
    match args.get_one::<String>("indent") {
        Some(indent) if format == Format::Newick => {
            for tree in &trees {
                writer.write_fmt(format_args!("{}\n", tree.to_newick_with_format(indent)))?;
            }
        }
        _ => utils::write_trees(&mut writer, &trees, format)?,
    }

    Ok(())
}
