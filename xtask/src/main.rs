use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use fs_err as fs;
use tailpatch_types::PluginSpec;

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Workspace helper tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print schema identifiers used by tailpatch reports.
    PrintSchemas,
    /// Print the capability profile of a version as Markdown.
    Capabilities {
        version: String,
        /// Emit JSON instead of Markdown.
        #[arg(long)]
        json: bool,
    },
    /// Print the build steps a version routes to.
    Route { version: String },
    /// Show the diff a plugin set would produce against an extracted tree.
    Preview {
        /// The lineage root (the directory holding package.json).
        #[arg(long)]
        root: Utf8PathBuf,
        #[arg(long)]
        version: String,
        /// Dependency lines, e.g. `"daisyui": "^4.12.23"`.
        #[arg(long = "plugin", required = true)]
        plugins: Vec<String>,
        /// Require statements for the legacy stub, in plugin order.
        #[arg(long = "require")]
        requires: Vec<String>,
        /// Write the diff here instead of stdout.
        #[arg(long)]
        out: Option<Utf8PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::PrintSchemas => {
            println!("{}", tailpatch_types::schema::TAILPATCH_PIPELINE_V1);
        }
        Command::Capabilities { version, json } => {
            let profile = tailpatch_domain::resolve(&version);
            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                print!("{}", tailpatch_render::render_profile_md(&version, &profile));
            }
        }
        Command::Route { version } => {
            let strategy = tailpatch_domain::select_build_strategy(&version)?;
            println!("toolchain: {}", strategy.toolchain.program());
            for step in &strategy.steps {
                println!("{}: {}", step.working_dir, step.command_line());
            }
        }
        Command::Preview {
            root,
            version,
            plugins,
            requires,
            out,
        } => {
            let specs = plugin_specs(&plugins, &requires)?;
            let diff = tailpatch_edit::preview_plugins(&specs, &version, &root)?;
            match out {
                Some(path) => fs::write(&path, diff).with_context(|| format!("write {path}"))?,
                None => print!("{diff}"),
            }
        }
    }
    Ok(())
}

fn plugin_specs(lines: &[String], requires: &[String]) -> anyhow::Result<Vec<PluginSpec>> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let spec = PluginSpec::new(line.as_str())
                .with_context(|| format!("invalid plugin {line}"))?;
            Ok(match requires.get(i) {
                Some(req) => spec.with_legacy_require(req.as_str()),
                None => spec,
            })
        })
        .collect()
}
