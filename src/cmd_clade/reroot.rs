use super::utils;
use clap::*;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("reroot")
        .about("Root on an outgroup or at the midpoint")
        .after_help(
            r###"
With outgroup taxa, places the root on the branch above their most recent
common ancestor. Without any, places the root at the midpoint of the
longest tip-to-tip path.

Notes:
* Outgroup taxa are named with `--node`, `--file` and `--regex`.
* `--location` is the fraction of the outgroup branch, from the ingroup
  side, where the root goes. 0.5 is the middle.
* The outgroup must not span the current root. Reroot on a single
  ingroup tip first if it does.
* The old root is spliced out when it is left with one child.
* Pairwise tip distances are preserved.

Examples:
1. Outgroup rooting:
   clade reroot tree.nwk -n Wuhan-Hu-1

2. Root at the outgroup's end of its branch:
   clade reroot tree.nwk -n OutA -n OutB --location 1

3. Midpoint rooting:
   clade reroot tree.nwk

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
            Arg::new("location")
                .long("location")
                .short('l')
                .num_args(1)
                .value_parser(value_parser!(f64))
                .default_value("0.5")
                .help("Position of the root on the outgroup branch, 0 to 1"),
        );

    utils::args_names(cmd).arg(utils::arg_format()).arg(
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
    let location = *args.get_one::<f64>("location").unwrap();

    let is_midpoint = !args.contains_id("node")
        && !args.contains_id("file")
        && !args.contains_id("regex");

    //----------------------------
    // Operating
    //----------------------------
    let mut trees = utils::read_trees(infile)?;
    for tree in trees.iter_mut() {
        if is_midpoint {
            let (a, b, d) = tree.diameter()?;
            log::info!(
                "Longest path: {} - {}, length {}",
                tree.node(a)?.name.as_deref().unwrap_or(""),
                tree.node(b)?.name.as_deref().unwrap_or(""),
                d
            );
            tree.reroot_midpoint()?;
        } else {
            let mut outgroup = utils::requested_names(args);
            outgroup.extend(utils::regex_names(tree, args)?);
            if outgroup.is_empty() {
                return Err(anyhow::anyhow!("No outgroup taxa matched"));
            }
            tree.reroot_outgroup(&outgroup, location)?;
        }
        tree.compact();
    }

    //----------------------------
    // Output
    //----------------------------
    utils::write_trees(&mut writer, &trees, format)?;

    Ok(())
}
