extern crate clap;
use clap::*;
use simplelog::{CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode};

mod cmd_clade;

fn main() -> anyhow::Result<()> {
    let app = Command::new("clade")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`clade` - Rooted phylogenetic tree operations")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Report progress and counts on stderr"),
        )
        .subcommand(cmd_clade::annotate::make_subcommand())
        .subcommand(cmd_clade::collapse::make_subcommand())
        .subcommand(cmd_clade::convert::make_subcommand())
        .subcommand(cmd_clade::extract::make_subcommand())
        .subcommand(cmd_clade::insert::make_subcommand())
        .subcommand(cmd_clade::prune::make_subcommand())
        .subcommand(cmd_clade::reorder::make_subcommand())
        .subcommand(cmd_clade::reroot::make_subcommand())
        .subcommand(cmd_clade::scale::make_subcommand())
        .subcommand(cmd_clade::split::make_subcommand())
        .subcommand(cmd_clade::stat::make_subcommand())
        .subcommand(cmd_clade::tmrca::make_subcommand())
        .after_help(
            r###"Subcommand groups:

* Structure:
    * collapse - Contract short internal branches
    * insert   - Add tips next to existing tips
    * prune    - Keep or remove taxa
    * reorder  - Sort clades by size
    * reroot   - Root on an outgroup or at the midpoint
    * scale    - Rescale branch lengths

* Clades:
    * split    - Split into monophyletic subtrees by tip attribute
    * tmrca    - Height of the common ancestor of taxa

* Annotation:
    * annotate - Copy metadata columns onto tips
    * extract  - Write tip attributes as CSV

* Info:
    * stat     - Tree statistics
    * convert  - Newick <-> Nexus

"###,
        );

    let matches = app.get_matches();

    let level = if matches.get_flag("verbose") {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )])?;

    // Check which subcommand the user ran...
    match matches.subcommand() {
        Some(("annotate", sub_matches)) => cmd_clade::annotate::execute(sub_matches),
        Some(("collapse", sub_matches)) => cmd_clade::collapse::execute(sub_matches),
        Some(("convert", sub_matches)) => cmd_clade::convert::execute(sub_matches),
        Some(("extract", sub_matches)) => cmd_clade::extract::execute(sub_matches),
        Some(("insert", sub_matches)) => cmd_clade::insert::execute(sub_matches),
        Some(("prune", sub_matches)) => cmd_clade::prune::execute(sub_matches),
        Some(("reorder", sub_matches)) => cmd_clade::reorder::execute(sub_matches),
        Some(("reroot", sub_matches)) => cmd_clade::reroot::execute(sub_matches),
        Some(("scale", sub_matches)) => cmd_clade::scale::execute(sub_matches),
        Some(("split", sub_matches)) => cmd_clade::split::execute(sub_matches),
        Some(("stat", sub_matches)) => cmd_clade::stat::execute(sub_matches),
        Some(("tmrca", sub_matches)) => cmd_clade::tmrca::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
