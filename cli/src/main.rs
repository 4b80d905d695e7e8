//! refbatch CLI: plan and run batched URI lookups from the terminal.
//!
//! Usage:
//! ```bash
//! # Show the batches a resolve would send (no network)
//! refbatch plan --input jobs.json --key occupationUri
//!
//! # Resolve every object's reference and attach the entity
//! refbatch resolve --url https://api.example.org --kind occupations \
//!     --input jobs.json --key occupationUri
//! ```

mod logging;

use std::env;
use std::process;

use anyhow::{bail, Context};
use serde::Serialize;
use serde_json::Value;

use refbatch_core::{
    BatchLookup, BatchResolver, CancelSignal, FnLookup, Resolution, ResolveError, ResolverConfig,
};
use refbatch_http::{profiles, HttpLookupConfig};

use crate::logging::{init_tracing, LogConfig};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let log = LogConfig {
        level: parse_flag(&args, "--log-level").unwrap_or_else(|| LogConfig::default().level),
        json: has_flag(&args, "--log-json"),
    };
    init_tracing(&log);

    let result = match args[1].as_str() {
        "plan" => cmd_plan(&args[2..]),
        "resolve" => cmd_resolve(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("refbatch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("refbatch {}", env!("CARGO_PKG_VERSION"));
    println!("Resolve URI references in batches against a paged lookup endpoint\n");
    println!("USAGE:");
    println!("    refbatch <COMMAND> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    plan       Print the lookup batches for an input file (no network)");
    println!("    resolve    Resolve references and print objects with their entities");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("FLAGS:");
    println!("    --input <FILE>     JSON array of objects            [required]");
    println!("    --key <FIELD>      Field holding the reference URI  [required]");
    println!("    --url <URL>        Lookup API base URL              [resolve]");
    println!("    --kind <KIND>      competences | occupations        [resolve]");
    println!("    --config <FILE>    JSON resolver configuration");
    println!("    --max-len <N>      Batch budget (default 4096)");
    println!("    --log-level <LVL>  Log level when RUST_LOG is unset (default warn)");
    println!("    --log-json         Emit JSON logs on stderr");
}

fn load_config(args: &[String]) -> anyhow::Result<ResolverConfig> {
    let config = match parse_flag(args, "--config") {
        Some(path) => ResolverConfig::from_file(&path)?,
        None => ResolverConfig::default(),
    };
    let mut config = config.with_env_overrides()?;
    if let Some(max_len) = parse_flag(args, "--max-len") {
        config.budget.max_len = max_len
            .parse()
            .with_context(|| format!("--max-len: not a number: {max_len}"))?;
        config.budget.validate()?;
    }
    Ok(config)
}

/// Load the input array and split it into objects that carry a string key
/// and the count of those that do not.
fn load_objects(args: &[String]) -> anyhow::Result<(Vec<Value>, String, usize)> {
    let input = parse_flag(args, "--input").context("--input is required")?;
    let field = parse_flag(args, "--key").context("--key is required")?;

    let raw = std::fs::read_to_string(&input).with_context(|| format!("reading {input}"))?;
    let parsed: Value = serde_json::from_str(&raw).with_context(|| format!("parsing {input}"))?;
    let Value::Array(items) = parsed else {
        bail!("{input}: expected a JSON array of objects");
    };

    let total = items.len();
    let keyed: Vec<Value> = items
        .into_iter()
        .filter(|o| key_field(o, &field).is_some())
        .collect();
    let skipped = total - keyed.len();
    if skipped > 0 {
        tracing::warn!(skipped, field = %field, "objects without a string key are ignored");
    }
    Ok((keyed, field, skipped))
}

fn key_field<'a>(obj: &'a Value, field: &str) -> Option<&'a str> {
    obj.get(field).and_then(Value::as_str)
}

fn cmd_plan(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let (objects, field, _) = load_objects(args)?;

    // planning needs no endpoint; an empty in-memory lookup stands in
    let no_lookup = FnLookup::new("none", |_keys: Vec<String>, _cancel: Option<CancelSignal>| async {
        Ok::<_, ResolveError>(Vec::<Value>::new())
    });
    let resolver = BatchResolver::with_budget(no_lookup, config.budget)?;
    let batches = resolver.plan(
        objects
            .iter()
            .filter_map(|o| key_field(o, &field))
            .map(str::to_owned),
    );

    let summary: Vec<Value> = batches
        .iter()
        .enumerate()
        .map(|(i, keys)| {
            serde_json::json!({
                "batch": i,
                "keys": keys.len(),
                "encodedLen": config.budget.encoded_len(keys),
                "uris": keys,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn cmd_resolve(args: &[String]) -> anyhow::Result<()> {
    let url = parse_flag(args, "--url").context("--url is required")?;
    let kind = parse_flag(args, "--kind").context("--kind is required")?;
    let config = load_config(args)?;
    let (objects, field, skipped) = load_objects(args)?;
    let http = HttpLookupConfig::from_resolver_config(&config);

    let cancel = CancelSignal::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let output = match kind.as_str() {
        "competences" => {
            let client = profiles::competences(&url, http)?;
            resolve_attached(client, &config, objects, &field, &cancel).await?
        }
        "occupations" => {
            let client = profiles::occupations(&url, http)?;
            resolve_attached(client, &config, objects, &field, &cancel).await?
        }
        other => bail!("unknown --kind {other:?} (expected competences or occupations)"),
    };

    println!("{}", serde_json::to_string_pretty(&output.results)?);
    eprintln!(
        "{} resolved in {} batch(es), {} unresolved key(s), {} object(s) without key",
        output.results.len(),
        output.batches,
        output.unresolved.len(),
        skipped
    );
    for uri in &output.unresolved {
        eprintln!("  unresolved: {uri}");
    }
    Ok(())
}

/// Resolve and attach each entity to its source object under `"resolved"`.
async fn resolve_attached<L>(
    lookup: L,
    config: &ResolverConfig,
    objects: Vec<Value>,
    field: &str,
    cancel: &CancelSignal,
) -> anyhow::Result<Resolution<Value>>
where
    L: BatchLookup,
    L::Entity: Serialize,
{
    let resolver = BatchResolver::with_budget(lookup, config.budget)?;
    let resolution = resolver
        .try_resolve_detailed(
            Some(objects),
            |o| key_field(o, field).unwrap_or_default().to_owned(),
            attach_entity,
            Some(cancel),
        )
        .await
        .context("resolving references")?;
    Ok(resolution)
}

/// Attach `entity` to `obj` under `"resolved"`. A failed serialization
/// fails the whole resolve rather than emitting `null`.
fn attach_entity<E: Serialize>(mut obj: Value, entity: &E) -> anyhow::Result<Value> {
    let resolved = serde_json::to_value(entity).context("serializing resolved entity")?;
    if let Value::Object(map) = &mut obj {
        map.insert("resolved".into(), resolved);
    }
    Ok(obj)
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
