use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde_json::Value as Json;
use tracing_subscriber::EnvFilter;
use tsr_lifecycle::{tenant_reconciler, tenant_settings_schema, BaselineSnapshot, EngineConfig};
use tsr_tree::{wire, SettingsTree};

fn path_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn cli() -> Command {
    Command::new("tsr")
        .version(tsr_lifecycle::VERSION)
        .about("Tenant settings reconciliation")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Engine configuration (.yaml, .yml or .toml)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(Command::new("schema").about("List every declared tenant setting"))
        .subcommand(
            Command::new("mask")
                .about("List the settings a configuration manages")
                .arg(path_arg("desired", "Desired settings (.yaml or .json)")),
        )
        .subcommand(
            Command::new("reconcile")
                .about("Reconcile a configuration against a remote settings object")
                .arg(path_arg("desired", "Desired settings (.yaml or .json)"))
                .arg(path_arg("remote", "Remote settings object in wire form")),
        )
        .subcommand(
            Command::new("preprocess")
                .about("Build the update payload for a plan")
                .arg(path_arg("prior", "Previously applied settings"))
                .arg(path_arg("planned", "Planned settings")),
        )
        .subcommand(
            Command::new("hash")
                .about("Baseline hash of a remote settings object")
                .arg(path_arg("remote", "Remote settings object in wire form")),
        )
}

fn init_tracing(filter: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_document(path: &Path) -> Result<Json> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    let doc = if is_yaml {
        serde_yaml::from_str(&text).with_context(|| format!("invalid YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?
    };
    Ok(doc)
}

fn load_tree(path: &Path) -> Result<SettingsTree> {
    let doc = read_document(path)?;
    SettingsTree::from_json(&doc).with_context(|| format!("invalid settings in {}", path.display()))
}

fn path_of<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    match args.get_one::<PathBuf>(name) {
        Some(path) => Ok(path.as_path()),
        None => bail!("missing --{name}"),
    }
}

fn execute(matches: &ArgMatches, config: &EngineConfig) -> Result<String> {
    let schema = tenant_settings_schema();
    let engine = tenant_reconciler(config.mismatch_policy);

    match matches.subcommand() {
        Some(("schema", _)) => Ok(schema
            .leaf_paths()
            .into_iter()
            .map(|(path, spec)| {
                let wire = schema
                    .wire_path_of(&path)
                    .map_or_else(|| spec.wire().to_string(), |wire| wire.to_string());
                format!("{path}\t{wire}\t{}", spec.kind().name())
            })
            .collect::<Vec<_>>()
            .join("\n")),
        Some(("mask", args)) => {
            let desired = load_tree(path_of(args, "desired")?)?;
            let mask = engine.mask(&desired);
            tracing::info!("Configuration manages {} settings", mask.leaf_count());
            Ok(mask
                .paths()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Some(("reconcile", args)) => {
            let desired = load_tree(path_of(args, "desired")?)?;
            let remote = wire::decode(schema, &read_document(path_of(args, "remote")?)?)?;
            let reconciled = engine.reconcile(&desired, &remote)?;
            if !reconciled.mismatches.is_empty() {
                tracing::warn!("Skipped {} mismatched settings", reconciled.mismatches.len());
            }
            Ok(serde_json::to_string_pretty(&reconciled.tree.to_json())?)
        }
        Some(("preprocess", args)) => {
            let prior = load_tree(path_of(args, "prior")?)?;
            let planned = load_tree(path_of(args, "planned")?)?;
            let (payload, cleared) = engine.preprocess(&prior, &planned);
            for path in &cleared {
                tracing::info!("Clearing {} with the zero sentinel", path);
            }
            Ok(serde_json::to_string_pretty(&wire::encode(schema, &payload)?)?)
        }
        Some(("hash", args)) => {
            let remote = read_document(path_of(args, "remote")?)?;
            Ok(BaselineSnapshot::capture(remote).hash().to_string())
        }
        Some((other, _)) => bail!("unknown command: {other}"),
        None => bail!("no command given"),
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => EngineConfig::default(),
    };
    init_tracing(&config.log_filter, matches.get_flag("json-logs"));

    let output = execute(&matches, &config)?;
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn run(args: &[&str]) -> Result<String> {
        let matches = cli().try_get_matches_from(args)?;
        execute(&matches, &EngineConfig::default())
    }

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn mask_lists_managed_paths() {
        let desired = file(
            ".yaml",
            "walk_me_opt_out: true\npower_platform:\n  search:\n    disable_docs_search: true\n",
        );
        let out = run(&["tsr", "mask", "--desired", desired.path().to_str().unwrap()]).unwrap();
        let mut lines: Vec<&str> = out.lines().collect();
        lines.sort_unstable();
        assert_eq!(lines, vec!["power_platform.search.disable_docs_search", "walk_me_opt_out"]);
    }

    #[test]
    fn reconcile_keeps_configured_scope() {
        let desired = file(".yaml", "power_platform:\n  search:\n    disable_docs_search: true\n");
        let remote = file(
            ".json",
            r#"{"walkMeOptOut": true, "powerPlatform": {"search": {"disableDocsSearch": false, "disableCommunitySearch": true}}}"#,
        );
        let out = run(&[
            "tsr",
            "reconcile",
            "--desired",
            desired.path().to_str().unwrap(),
            "--remote",
            remote.path().to_str().unwrap(),
        ])
        .unwrap();
        let state: Json = serde_json::from_str(&out).unwrap();
        assert_eq!(
            state,
            serde_json::json!({ "power_platform": { "search": { "disable_docs_search": false } } })
        );
    }

    #[test]
    fn preprocess_substitutes_zero_identifier() {
        let prior = file(
            ".json",
            r#"{"power_platform": {"governance": {"environment_routing_target_security_group_id": "3f2c9d8e-1b4a-4c6d-8e7f-0a1b2c3d4e5f"}}}"#,
        );
        let planned = file(".json", r#"{"power_platform": {"governance": {}}}"#);
        let out = run(&[
            "tsr",
            "preprocess",
            "--prior",
            prior.path().to_str().unwrap(),
            "--planned",
            planned.path().to_str().unwrap(),
        ])
        .unwrap();
        let payload: Json = serde_json::from_str(&out).unwrap();
        assert_eq!(
            payload["powerPlatform"]["governance"]["environmentRoutingTargetSecurityGroupId"],
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn hash_ignores_key_order() {
        let a = file(".json", r#"{"a": true, "b": {"c": 1, "d": 2}}"#);
        let b = file(".json", r#"{"b": {"d": 2, "c": 1}, "a": true}"#);
        let hash_a = run(&["tsr", "hash", "--remote", a.path().to_str().unwrap()]).unwrap();
        let hash_b = run(&["tsr", "hash", "--remote", b.path().to_str().unwrap()]).unwrap();
        assert_eq!(hash_a, hash_b);
        assert_eq!(hash_a.len(), 64);
    }

    #[test]
    fn schema_lists_wire_locations() {
        let out = run(&["tsr", "schema"]).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines.contains(
            &"power_platform.product_feedback.disable_microsoft_follow_up\tdisableNPSCommentsReachout\tbool"
        ));
        assert!(lines.contains(
            &"power_platform.search.disable_docs_search\tpowerPlatform.search.disableDocsSearch\tbool"
        ));
    }

    #[test]
    fn unreadable_input_is_reported() {
        let err = run(&["tsr", "mask", "--desired", "/nonexistent/desired.yaml"]).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
