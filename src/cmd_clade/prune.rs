use super::utils;
use clade::libs::metadata::{delimiter_for, taxon_key, MetadataIndex};
use clade::libs::phylo::{MissingPolicy, TreeError};
use clap::*;
use std::collections::{BTreeSet, HashSet};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("prune")
        .about("Keep or remove taxa")
        .after_help(
            r###"
Removes the named taxa, or with `--keep` removes everything else. The
result is the subtree induced by the remaining tips: unary nodes are
spliced out and their branch lengths summed, so the distance between any
two remaining tips is unchanged.

Notes:
* Taxa are named with `--node`, `--file`, `--regex` and the keys of a
  `--metadata` table.
* Names and metadata keys are compared with the key of each tip, see
  `--field`. `--regex` is matched against whole tip names.
* A named taxon not in the tree stops the command, unless
  `--ignore-missing` is set.
* At least two tips must remain.
* The most recent common ancestor of the remaining tips becomes the root.
* `--output-metadata` writes the metadata rows of the remaining tips,
  CSV for `.csv` files and TSV otherwise.

Examples:
1. Drop two tips:
   clade prune tree.nwk -n A -n B

2. Keep only the taxa listed in a file:
   clade prune tree.nwk --keep -f keep.lst

3. Drop reference genomes by pattern:
   clade prune tree.nwk -r "^ref_"

4. Keep the sequences of a metadata table, and their rows:
   clade prune tree.nwk --keep --metadata meta.csv --field 2 \
       --ignore-missing --output-metadata kept.csv

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
            Arg::new("keep")
                .long("keep")
                .short('k')
                .action(ArgAction::SetTrue)
                .help("Keep the named taxa instead of removing them"),
        )
        .arg(utils::arg_ignore_missing())
        .arg(
            Arg::new("metadata")
                .long("metadata")
                .short('m')
                .num_args(1)
                .help("Metadata table whose keys name taxa"),
        )
        .arg(
            Arg::new("output_metadata")
                .long("output-metadata")
                .num_args(1)
                .requires("metadata")
                .help("Write the metadata rows of the remaining tips to this file"),
        );

    let cmd = utils::args_names(cmd);
    utils::args_metadata(cmd).arg(utils::arg_format()).arg(
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
    let is_keep = args.get_flag("keep");
    let field = *args.get_one::<usize>("field").unwrap();
    let delimiter = *args.get_one::<char>("delimiter").unwrap();

    let table = match args.get_one::<String>("metadata") {
        Some(metadata) => Some(utils::load_table(metadata, args)?),
        None => None,
    };

    let mut targets = utils::requested_names(args);
    if let Some(table) = &table {
        targets.extend(table.keys().into_iter().map(|k| k.to_string()));
    }
    if targets.is_empty() && !args.contains_id("regex") {
        return Err(anyhow::anyhow!(
            "No taxa given, use --node, --file, --regex or --metadata"
        ));
    }

    //----------------------------
    // Operating
    //----------------------------
    let trees = utils::read_trees(infile)?;
    let mut pruned = Vec::with_capacity(trees.len());
    for tree in &trees {
        // (tip name, metadata key)
        let tips: Vec<(String, String)> = tree
            .tip_map()
            .into_keys()
            .map(|name| {
                let key = taxon_key(&name, field, delimiter)
                    .unwrap_or_default()
                    .to_string();
                (name, key)
            })
            .collect();
        let tip_keys: HashSet<&str> = tips.iter().map(|(_, key)| key.as_str()).collect();

        let mut named: HashSet<&str> = HashSet::new();
        let mut skipped = 0;
        for target in &targets {
            if tip_keys.contains(target.as_str()) {
                named.insert(target.as_str());
            } else if policy == MissingPolicy::Skip {
                skipped += 1;
            } else {
                return Err(TreeError::MissingTaxon(target.clone()).into());
            }
        }
        if skipped > 0 {
            log::warn!("{} taxa not found in the tree, skipped", skipped);
        }

        let by_regex: HashSet<String> = utils::regex_names(tree, args)?.into_iter().collect();

        let keep: Vec<&str> = tips
            .iter()
            .filter(|(name, key)| {
                let is_named = named.contains(key.as_str()) || by_regex.contains(name);
                is_named == is_keep
            })
            .map(|(name, _)| name.as_str())
            .collect();

        let (induced, _) = tree.induce_subtree(&keep, MissingPolicy::Fail)?;
        log::info!("Kept {} of {} tip(s)", keep.len(), tips.len());
        pruned.push(induced);
    }

    //----------------------------
    // Output
    //----------------------------
    utils::write_trees(&mut writer, &pruned, format)?;

    if let Some(outfile) = args.get_one::<String>("output_metadata") {
        let table = table.ok_or_else(|| anyhow::anyhow!("--output-metadata needs --metadata"))?;

        let mut seen = BTreeSet::new();
        let mut keys: Vec<String> = Vec::new();
        for tree in &pruned {
            for name in tree.get_leaf_names().into_iter().flatten() {
                if let Some(key) = taxon_key(&name, field, delimiter) {
                    if seen.insert(key.to_string()) {
                        keys.push(key.to_string());
                    }
                }
            }
        }

        let mut meta_writer = intspan::writer(outfile);
        let n = table.write_rows(&mut meta_writer, &keys, delimiter_for(outfile))?;
        log::info!("Wrote {} metadata row(s) to {}", n, outfile);
    }

    Ok(())
}
