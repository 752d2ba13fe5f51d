//! `weave`: a small build-tool front end wired through argweave.
//!
//! Parses its arguments, prints any errors with the offending input
//! underlined, prints the parsed values as JSON (or a synopsis for
//! `--help`) and exits with the rolled-up error code.
//!
//! ```text
//! weave -vv build app lib --release --features [serde tracing]
//! weave run --bin server -- --port 8080
//! ```
//!
//! Parser configuration can be overridden through `WEAVE_PARSE_CONFIG`,
//! e.g. `WEAVE_PARSE_CONFIG='{"min-exit-level": "warning"}'`. Set
//! `RUST_LOG=argweave=trace` to watch the tokenizer and parser.

use anyhow::{Context, Result};
use argweave::{
    types, Argument, ArgumentGroup, Command, CommandTree, ConfigOverrides, ErrorFormatter,
    ParsedArguments, ValueCount,
};

const CONFIG_ENV: &str = "WEAVE_PARSE_CONFIG";

fn build_tree() -> Result<CommandTree> {
    let mut tree = CommandTree::new(
        Command::new("weave")
            .description("Build and run projects")
            .on_success(|args| tracing::info!(verbosity = ?args.get::<i64>("verbose"), "weave")),
    )?;
    let root = tree.root();
    tree.add_argument(
        root,
        Argument::new("verbose", types::Counter)
            .alias("v")
            .description("More output, repeatable"),
    )?;
    tree.add_argument(
        root,
        Argument::new("help", types::Flag)
            .alias("h")
            .unique()
            .priority(100)
            .description("Show help")
            .on_value(|_| tracing::debug!("help requested")),
    )?;
    tree.add_argument(
        root,
        Argument::new("define", types::KeyValues::new(types::Text)?)
            .alias("D")
            .description("Set build variables: -D key=value ..."),
    )?;

    let build = tree.add_command(
        root,
        Command::new("build")
            .alias("b")
            .description("Compile targets")
            .error_code(2)
            .on_success(|args| tracing::info!(targets = ?args.get::<Vec<String>>("targets"), "build")),
    )?;
    tree.add_argument(
        build,
        Argument::new("targets", types::TextList::new(ValueCount::AT_LEAST_ONE))
            .positional()
            .required(),
    )?;
    tree.add_argument(build, Argument::new("release", types::Flag).alias("r"))?;
    tree.add_argument(build, Argument::new("debug", types::Flag).alias("d"))?;
    tree.add_argument(build, Argument::new("jobs", types::Int).alias("j"))?;
    tree.add_argument(
        build,
        Argument::new("features", types::TextList::new(ValueCount::between(1, 8))),
    )?;
    tree.add_argument(
        build,
        Argument::new("profile", types::OptList::new(["dev", "test", "bench"]).initial("dev")?),
    )?;
    tree.add_group(
        build,
        ArgumentGroup::new("mode")
            .exclusive()
            .argument("release")
            .argument("debug"),
    )?;

    let run = tree.add_command(
        root,
        Command::new("run")
            .description("Run a binary, passing everything after -- to it")
            .error_code(4)
            .on_success(|args| tracing::info!(forward = ?args.forward(), "run")),
    )?;
    tree.add_argument(run, Argument::new("bin", types::Text).required())?;
    tree.add_argument(run, Argument::new("timeout", types::Float))?;

    Ok(tree)
}

fn apply_env_config(tree: &mut CommandTree) -> Result<()> {
    let Ok(raw) = std::env::var(CONFIG_ENV) else {
        return Ok(());
    };
    let overrides: ConfigOverrides =
        serde_json::from_str(&raw).with_context(|| format!("invalid {CONFIG_ENV}"))?;
    tree.config_mut(tree.root())
        .apply(&overrides)
        .with_context(|| format!("invalid {CONFIG_ENV}"))?;
    tree.propagate_config();
    tracing::debug!(?overrides, "applied parse config");
    Ok(())
}

/// Synopsis of the deepest reached command, arguments by priority.
fn print_help(tree: &CommandTree) {
    let Some(&command) = tree.reached_path().last() else {
        return;
    };
    println!("usage: {}", tree.command_path(command).join(" "));
    if let Some(description) = tree.command(command).get_description() {
        println!("\n{description}");
    }
    for argument in tree.arguments_by_priority(command) {
        let name = if argument.is_positional() {
            format!("<{}>", argument.name())
        } else {
            format!("--{}", argument.name())
        };
        println!(
            "  {name:<14} {:<22} {}",
            argument.type_signature(),
            argument.get_description().unwrap_or_default()
        );
    }
    for &sub in tree.sub_commands(command) {
        let sub = tree.command(sub);
        println!("  {:<37} {}", sub.name(), sub.get_description().unwrap_or_default());
    }
}

fn print_parsed(parsed: &ParsedArguments) -> Result<()> {
    let json = serde_json::to_string_pretty(parsed).context("serializing parsed arguments")?;
    println!("{json}");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut tree = build_tree()?;
    apply_env_config(&mut tree)?;

    let outcome = tree.parse(std::env::args().skip(1))?;

    if tree.has_display_errors(tree.root()) {
        let formatter = ErrorFormatter::new().styled(console::colors_enabled_stderr());
        eprint!("{}", formatter.render(&tree));
    }

    tree.invoke_callbacks()?;
    if outcome.parsed.get::<bool>("help") == Some(true) {
        print_help(&tree);
        return Ok(());
    }
    print_parsed(&outcome.parsed)?;

    if !outcome.is_success() {
        std::process::exit(outcome.exit_code);
    }
    Ok(())
}
