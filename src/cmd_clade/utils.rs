use clade::libs::metadata::{taxon_key, MetadataIndex, Record, Table};
use clade::libs::phylo::tree::io::{self, Format};
use clade::libs::phylo::tree::Tree;
use clade::libs::phylo::MissingPolicy;
use clap::*;
use regex::RegexBuilder;
use std::collections::BTreeSet;
use std::io::Write;

//----------------------------
// Shared arguments
//----------------------------

pub fn arg_format() -> Arg {
    Arg::new("format")
        .long("format")
        .num_args(1)
        .value_parser([
            builder::PossibleValue::new("newick"),
            builder::PossibleValue::new("nexus"),
        ])
        .default_value("newick")
        .help("Output tree format")
}

/// --node / --file / --regex
pub fn args_names(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("node")
            .long("node")
            .short('n')
            .num_args(1)
            .action(ArgAction::Append)
            .help("Taxon name"),
    )
    .arg(
        Arg::new("file")
            .long("file")
            .short('f')
            .num_args(1)
            .help("A file contains taxon names, one per line"),
    )
    .arg(
        Arg::new("regex")
            .long("regex")
            .short('r')
            .num_args(1)
            .action(ArgAction::Append)
            .help("Taxa matching the regular expression (case insensitive)"),
    )
}

pub fn arg_ignore_missing() -> Arg {
    Arg::new("ignore_missing")
        .long("ignore-missing")
        .short('i')
        .action(ArgAction::SetTrue)
        .help("Skip taxa not found in the tree instead of stopping")
}

/// --index / --field / --delimiter, for commands reading a metadata table
pub fn args_metadata(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("index")
            .long("index")
            .num_args(1)
            .help("Key column of the metadata table. Default is the first column"),
    )
    .arg(
        Arg::new("field")
            .long("field")
            .num_args(1)
            .value_parser(value_parser!(usize))
            .default_value("0")
            .help("Field of the tip name holding the key, 1-based. [0] for the whole name"),
    )
    .arg(
        Arg::new("delimiter")
            .long("delimiter")
            .num_args(1)
            .value_parser(value_parser!(char))
            .default_value("|")
            .help("Delimiter between fields of tip names"),
    )
}

//----------------------------
// Input and output
//----------------------------

pub fn read_trees(infile: &str) -> anyhow::Result<Vec<Tree>> {
    let trees = Tree::from_file(infile)?;
    log::info!("Read {} tree(s) from {}", trees.len(), infile);
    Ok(trees)
}

pub fn output_format(args: &ArgMatches) -> anyhow::Result<Format> {
    args.get_one::<String>("format").unwrap().parse::<Format>()
}

pub fn write_trees(writer: &mut dyn Write, trees: &[Tree], format: Format) -> anyhow::Result<()> {
    writer.write_all(io::write_trees(trees, format).as_bytes())?;
    Ok(())
}

//----------------------------
// Taxon selection
//----------------------------

/// Names given literally by --node and --file, in order.
pub fn requested_names(args: &ArgMatches) -> Vec<String> {
    let mut names = Vec::new();

    if args.contains_id("node") {
        for name in args.get_many::<String>("node").unwrap() {
            names.push(name.to_string());
        }
    }

    if args.contains_id("file") {
        let file = args.get_one::<String>("file").unwrap();
        names.extend(intspan::read_first_column(file));
    }

    names
}

/// Tip names selected by --node, --file and --regex.
///
/// Literal names absent from the tree are an error, or are dropped with a
/// warning under `MissingPolicy::Skip`. Returns the names found and the
/// number dropped.
pub fn match_names(
    tree: &Tree,
    args: &ArgMatches,
    policy: MissingPolicy,
) -> anyhow::Result<(Vec<String>, usize)> {
    let (ids, missing) = tree.resolve_taxa(&requested_names(args), policy)?;
    for name in &missing {
        log::warn!("Taxon, {}, not found in the tree, skipped", name);
    }

    let mut seen = BTreeSet::new();
    let mut names: Vec<String> = ids
        .into_iter()
        .filter_map(|id| tree.get_node(id).and_then(|n| n.name.clone()))
        .filter(|n| seen.insert(n.clone()))
        .collect();

    for name in regex_names(tree, args)? {
        if seen.insert(name.clone()) {
            names.push(name);
        }
    }

    Ok((names, missing.len()))
}

/// Tip names matching any --regex, case insensitive.
pub fn regex_names(tree: &Tree, args: &ArgMatches) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    if args.contains_id("regex") {
        let tips = tree.tip_map();
        for regex in args.get_many::<String>("regex").unwrap() {
            let re = RegexBuilder::new(regex).case_insensitive(true).build()?;
            names.extend(tips.keys().filter(|name| re.is_match(name)).cloned());
        }
    }
    Ok(names)
}

//----------------------------
// Metadata
//----------------------------

pub fn load_table(infile: &str, args: &ArgMatches) -> anyhow::Result<Table> {
    let index = args.get_one::<String>("index").map(|s| s.as_str());
    let table = Table::from_file(infile, index)?;
    log::info!(
        "Read {} record(s) keyed by {} from {}",
        table.len(),
        table.index_column(),
        infile
    );
    Ok(table)
}

/// Record of a tip, looked up by the key in its name.
pub fn record_of<'a>(table: &'a Table, name: &str, args: &ArgMatches) -> Option<&'a Record> {
    let field = *args.get_one::<usize>("field").unwrap();
    let delimiter = *args.get_one::<char>("delimiter").unwrap();
    taxon_key(name, field, delimiter).and_then(|key| table.lookup(key))
}
