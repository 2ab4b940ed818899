use super::utils;
use clap::*;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("scale")
        .about("Rescale branch lengths")
        .after_help(
            r###"
Multiplies every branch length by a factor, or by whatever factor makes
the mean root-to-tip distance equal to `--height`.

Notes:
* Factors and heights must be positive.
* Missing branch lengths stay missing.
* `--collapse T` then contracts internal branches shorter than T, in the
  new units.

Examples:
1. Substitutions per site to substitutions per genome:
   clade scale tree.nwk --factor 29903

2. Scale to a mean root-to-tip distance of 1:
   clade scale tree.nwk --height 1

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
            Arg::new("factor")
                .long("factor")
                .short('s')
                .num_args(1)
                .value_parser(value_parser!(f64))
                .conflicts_with("height")
                .help("Multiply branch lengths by this factor"),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .num_args(1)
                .value_parser(value_parser!(f64))
                .help("Target mean root-to-tip distance"),
        )
        .group(
            ArgGroup::new("scaling")
                .args(["factor", "height"])
                .required(true),
        )
        .arg(
            Arg::new("collapse")
                .long("collapse")
                .short('c')
                .num_args(1)
                .value_parser(value_parser!(f64))
                .help("Contract internal branches shorter than this after scaling"),
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

    let opt_factor = args.get_one::<f64>("factor").copied();
    let opt_height = args.get_one::<f64>("height").copied();
    let opt_collapse = args.get_one::<f64>("collapse").copied();

    //----------------------------
    // Operating
    //----------------------------
    let mut trees = utils::read_trees(infile)?;
    for tree in trees.iter_mut() {
        match (opt_factor, opt_height) {
            (Some(factor), _) => tree.scale(factor)?,
            (None, Some(height)) => {
                let factor = tree.scale_to_height(height)?;
                log::info!("Scaled by {}", factor);
            }
            (None, None) => unreachable!(),
        }

        if let Some(threshold) = opt_collapse {
            let n = tree.collapse_below(threshold)?;
            log::info!("Contracted {} branch(es) shorter than {}", n, threshold);
        }
    }

    //----------------------------
    // Output
    //----------------------------
    utils::write_trees(&mut writer, &trees, format)?;

    Ok(())
}
