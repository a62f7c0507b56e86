//! Pluginreg CLI - curated plugin registry maintenance

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use pluginreg_core::commands::{self, plugin::AddRequest};
use pluginreg_core::config::Config;
use pluginreg_core::manifest::{HttpSource, ManifestFetcher, Schema};
use pluginreg_core::registry::{
    BlacklistEntry, BlacklistSpec, PluginEdit, PluginRecord, PluginRef, RefEdit, Registry,
    RegistryFormat,
};
use pluginreg_core::stats::RegistryStats;
use pluginreg_core::utils::split_list;
use pluginreg_core::{Error, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pluginreg")]
#[command(author, version, about = "Plugin registry maintenance tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Registry file (overrides registry.path from the configuration)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// More output: details in listings, -v info logs, -vv debug logs
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Plugin operations
    Plugin {
        #[command(subcommand)]
        action: PluginAction,
    },

    /// Plugin ref operations
    Ref {
        #[command(subcommand)]
        action: RefAction,
    },

    /// Blacklist operations
    Blacklist {
        #[command(subcommand)]
        action: BlacklistAction,
    },

    /// Validate the registry file
    Validate,

    /// Show registry statistics
    Stats {
        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the whole registry
    Output {
        /// Output format (toml or json)
        #[arg(long, default_value = "toml")]
        format: RegistryFormat,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum PluginAction {
    /// Add a plugin from its repository manifest
    Add {
        /// Git repository URL
        url: String,
        /// Trust level (default: least trusted level)
        #[arg(long)]
        trust: Option<String>,
        /// Categories, comma separated (default: from the manifest)
        #[arg(long)]
        categories: Option<String>,
        /// Refs with optional API ranges, e.g. 'main:4.0,picard-v3:3.0-3.99'
        #[arg(long)]
        refs: Option<String>,
        /// Version tagging scheme: semver, calver or regex:<pattern>
        #[arg(long)]
        versioning_scheme: Option<String>,
    },
    /// Refresh plugin metadata from its manifest
    Update {
        id: String,
        /// Git ref to fetch the manifest from (default: first ref or main)
        #[arg(long = "ref")]
        git_ref: Option<String>,
    },
    /// Edit registry-owned plugin fields
    Edit {
        id: String,
        #[arg(long)]
        trust: Option<String>,
        /// Categories, comma separated
        #[arg(long)]
        categories: Option<String>,
        #[arg(long)]
        git_url: Option<String>,
        /// semver, calver, regex:<pattern>, or an empty string to remove
        #[arg(long)]
        versioning_scheme: Option<String>,
    },
    /// Remove a plugin
    Remove { id: String },
    /// List plugins
    List {
        #[arg(long)]
        trust: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Show plugin details
    Show { id: String },
    /// Manage redirects from former repository URLs
    Redirect {
        id: String,
        /// Former git URL
        old_url: Option<String>,
        /// Remove the redirect instead of adding it
        #[arg(long)]
        remove: bool,
        /// List the plugin's redirects
        #[arg(long)]
        list: bool,
    },
}

#[derive(Subcommand)]
enum RefAction {
    /// Add a ref to a plugin
    Add {
        id: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        min_api_version: Option<String>,
        #[arg(long)]
        max_api_version: Option<String>,
    },
    /// Edit a ref; empty values remove optional fields
    Edit {
        id: String,
        name: String,
        /// New ref name
        #[arg(long = "name")]
        new_name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        min_api_version: Option<String>,
        #[arg(long)]
        max_api_version: Option<String>,
    },
    /// Remove a ref from a plugin
    Remove { id: String, name: String },
    /// List a plugin's refs
    List { id: String },
}

#[derive(Subcommand)]
enum BlacklistAction {
    /// Add a blacklist entry
    Add {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        uuid: Option<String>,
        #[arg(long)]
        url_regex: Option<String>,
        #[arg(long)]
        reason: String,
    },
    /// Remove blacklist entries
    Remove {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        uuid: Option<String>,
        #[arg(long)]
        url_regex: Option<String>,
    },
    /// List blacklist entries
    List,
    /// Show entries for an exact URL or UUID
    Show {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        uuid: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: could not initialise logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; `RUST_LOG` applies unless `-v` is given
fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pluginreg=warn")),
        1 => EnvFilter::new("pluginreg=info"),
        _ => EnvFilter::new("pluginreg=debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<Error>() {
        Some(Error::Validation(errors)) => {
            eprintln!("Error [ValidationError E200]: Validation failed");
            for error in errors {
                eprintln!("  - {}", error);
            }
        }
        Some(error) => {
            eprintln!("Error [{} {}]: {}", error.kind(), error.code(), error);
            if let Some(suggestion) = error.suggestion() {
                eprintln!("Hint: {}", suggestion);
            }
        }
        None => eprintln!("Error: {:#}", err),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let registry = cli.registry;
    match cli.command {
        Commands::Plugin { action } => cmd_plugin(&Context::load(registry)?, action, cli.verbose).await,
        Commands::Ref { action } => cmd_ref(&Context::load(registry)?, action),
        Commands::Blacklist { action } => cmd_blacklist(&Context::load(registry)?, action),
        Commands::Validate => cmd_validate(&Context::load(registry)?),
        Commands::Stats { json } => cmd_stats(&Context::load(registry)?, json),
        Commands::Output { format } => cmd_output(&Context::load(registry)?, format),
        Commands::Config { action } => cmd_config(action),
    }
}

/// Configuration plus the registry file it resolves to
struct Context {
    config: Config,
    registry_path: PathBuf,
}

impl Context {
    fn load(registry: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = Config::load()?;
        let registry_path = registry.unwrap_or_else(|| config.registry.path.clone());
        debug!(registry = %registry_path.display(), "Using registry");
        Ok(Self {
            config,
            registry_path,
        })
    }

    fn schema(&self) -> &Schema {
        &self.config.schema
    }

    fn open(&self) -> Result<Registry> {
        Registry::open(&self.registry_path, &self.config.registry.api_version)
    }

    fn save(&self, registry: &Registry) -> Result<()> {
        registry.persist(&self.registry_path)
    }

    fn fetcher(&self) -> Result<ManifestFetcher<HttpSource>> {
        let source = HttpSource::new(self.config.fetch.timeout(), &self.config.fetch.user_agent)?;
        Ok(ManifestFetcher::new(source).with_manifest_file(&self.config.fetch.manifest_file))
    }
}

/// Empty input clears an optional field
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| {
        let v = v.trim().to_string();
        (!v.is_empty()).then_some(v)
    })
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_plugin(ctx: &Context, action: PluginAction, verbose: u8) -> anyhow::Result<()> {
    match action {
        PluginAction::Add {
            url,
            trust,
            categories,
            refs,
            versioning_scheme,
        } => {
            let request = AddRequest {
                trust_level: trust,
                categories: categories.as_deref().map(split_list),
                refs: refs.as_deref().map(PluginRef::parse_list).transpose()?.unwrap_or_default(),
                versioning_scheme,
                ..AddRequest::new(url)
            };
            let fetcher = ctx.fetcher()?;
            let (registry, plugin) =
                commands::plugin::add(ctx.open()?, &fetcher, ctx.schema(), request).await?;
            ctx.save(&registry)?;
            println!("Added plugin: {} ({})", plugin.name, plugin.id);
        }
        PluginAction::Update { id, git_ref } => {
            let fetcher = ctx.fetcher()?;
            let (registry, plugin) = commands::plugin::update(
                ctx.open()?,
                &fetcher,
                ctx.schema(),
                &id,
                git_ref.as_deref(),
            )
            .await?;
            ctx.save(&registry)?;
            println!("Updated plugin: {} ({})", plugin.name, plugin.id);
        }
        PluginAction::Edit {
            id,
            trust,
            categories,
            git_url,
            versioning_scheme,
        } => {
            let edit = PluginEdit {
                trust_level: trust,
                categories: categories.as_deref().map(split_list),
                git_url,
                versioning_scheme: clearable(versioning_scheme),
            };
            let (registry, plugin) = commands::plugin::edit(ctx.open()?, ctx.schema(), &id, &edit)?;
            ctx.save(&registry)?;
            println!("Updated plugin: {} ({})", plugin.name, plugin.id);
        }
        PluginAction::Remove { id } => {
            let (registry, _) = commands::plugin::remove(ctx.open()?, ctx.schema(), &id)?;
            ctx.save(&registry)?;
            println!("Removed plugin: {}", id);
        }
        PluginAction::List { trust, category } => {
            let registry = ctx.open()?;
            let plugins = registry.list_plugins(trust.as_deref(), category.as_deref());
            for (i, plugin) in plugins.iter().enumerate() {
                if verbose > 0 {
                    if i > 0 {
                        println!();
                    }
                    print_plugin(plugin);
                } else {
                    println!("{}: {} ({})", plugin.id, plugin.name, plugin.trust_level);
                }
            }
        }
        PluginAction::Show { id } => {
            let registry = ctx.open()?;
            print_plugin(registry.get_plugin(&id)?);
        }
        PluginAction::Redirect {
            id,
            old_url,
            remove,
            list,
        } => cmd_redirect(ctx, &id, old_url, remove, list)?,
    }
    Ok(())
}

fn cmd_redirect(
    ctx: &Context,
    id: &str,
    old_url: Option<String>,
    remove: bool,
    list: bool,
) -> anyhow::Result<()> {
    let registry = ctx.open()?;

    if list {
        let plugin = registry.get_plugin(id)?;
        if plugin.redirect_from.is_empty() {
            println!("No redirects defined");
        }
        for url in &plugin.redirect_from {
            println!("{} -> {}", url, plugin.git_url);
        }
        return Ok(());
    }

    let old_url = old_url
        .ok_or_else(|| Error::validation("An old URL is required unless --list is given"))?;

    if remove {
        let (registry, ()) =
            commands::plugin::remove_redirect(registry, ctx.schema(), id, &old_url)?;
        ctx.save(&registry)?;
        println!("Removed redirect: {}", old_url);
    } else {
        let (registry, added) = commands::plugin::add_redirect(registry, ctx.schema(), id, &old_url)?;
        let git_url = &registry.get_plugin(id)?.git_url;
        if added {
            ctx.save(&registry)?;
            println!("Added redirect: {} -> {}", old_url.trim(), git_url);
        } else {
            println!("Redirect already defined: {} -> {}", old_url.trim(), git_url);
        }
    }
    Ok(())
}

fn print_plugin(plugin: &PluginRecord) {
    println!("ID: {}", plugin.id);
    println!("Name: {}", plugin.name);
    println!("UUID: {}", plugin.uuid);
    println!("Description: {}", plugin.description);
    println!("URL: {}", plugin.git_url);
    println!("Trust Level: {}", plugin.trust_level);
    println!("Categories: {}", plugin.categories.join(", "));
    println!("Authors: {}", plugin.authors.join(", "));
    if let Some(maintainers) = &plugin.maintainers {
        println!("Maintainers: {}", maintainers.join(", "));
    }
    if let Some(scheme) = &plugin.versioning_scheme {
        println!("Versioning Scheme: {}", scheme);
    }
    if !plugin.refs.is_empty() {
        let refs: Vec<&str> = plugin.refs.iter().map(|r| r.name.as_str()).collect();
        println!("Refs: {}", refs.join(", "));
    }
    if !plugin.redirect_from.is_empty() {
        println!("Redirects from: {}", plugin.redirect_from.join(", "));
    }
    println!("Added: {}", plugin.added_at.to_rfc3339());
    println!("Updated: {}", plugin.updated_at.to_rfc3339());
}

fn cmd_ref(ctx: &Context, action: RefAction) -> anyhow::Result<()> {
    match action {
        RefAction::Add {
            id,
            name,
            description,
            min_api_version,
            max_api_version,
        } => {
            let git_ref = PluginRef {
                description: clearable(description).flatten(),
                min_api_version: clearable(min_api_version).flatten(),
                max_api_version: clearable(max_api_version).flatten(),
                ..PluginRef::new(name.trim())
            };
            let (registry, ()) = commands::refs::add(ctx.open()?, ctx.schema(), &id, git_ref)?;
            ctx.save(&registry)?;
            println!("Added ref: {}", name.trim());
        }
        RefAction::Edit {
            id,
            name,
            new_name,
            description,
            min_api_version,
            max_api_version,
        } => {
            let edit = RefEdit {
                new_name,
                description: clearable(description),
                min_api_version: clearable(min_api_version),
                max_api_version: clearable(max_api_version),
            };
            let (registry, git_ref) =
                commands::refs::edit(ctx.open()?, ctx.schema(), &id, &name, &edit)?;
            ctx.save(&registry)?;
            println!("Updated ref: {}", git_ref.name);
        }
        RefAction::Remove { id, name } => {
            let (registry, removed) = commands::refs::remove(ctx.open()?, ctx.schema(), &id, &name)?;
            ctx.save(&registry)?;
            println!("Removed ref: {}", removed.name);
        }
        RefAction::List { id } => {
            let registry = ctx.open()?;
            let plugin = registry.get_plugin(&id)?;
            if plugin.refs.is_empty() {
                println!("No refs defined (using default: {})", plugin.default_ref());
            }
            for git_ref in &plugin.refs {
                let mut line = git_ref.name.clone();
                if let Some(description) = &git_ref.description {
                    line.push_str(&format!(" - {}", description));
                }
                if let Some(range) = git_ref.api_range() {
                    line.push_str(&format!(" ({})", range));
                }
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn cmd_blacklist(ctx: &Context, action: BlacklistAction) -> anyhow::Result<()> {
    match action {
        BlacklistAction::Add {
            url,
            uuid,
            url_regex,
            reason,
        } => {
            let spec = BlacklistSpec {
                url,
                uuid,
                url_regex,
                reason,
            };
            let (registry, entry) = commands::blacklist::add(ctx.open()?, ctx.schema(), spec)?;
            ctx.save(&registry)?;
            println!("Blacklisted: {}", entry.identifiers());
        }
        BlacklistAction::Remove {
            url,
            uuid,
            url_regex,
        } => {
            let (registry, removed) = commands::blacklist::remove(
                ctx.open()?,
                ctx.schema(),
                url.as_deref(),
                uuid.as_deref(),
                url_regex.as_deref(),
            )?;
            ctx.save(&registry)?;
            let identifier = [uuid, url, url_regex]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(", ");
            println!("Removed from blacklist: {} ({} entries)", identifier, removed);
        }
        BlacklistAction::List => {
            let registry = ctx.open()?;
            if registry.blacklist.is_empty() {
                println!("No blacklist entries");
            }
            for entry in &registry.blacklist {
                println!("{}: {}", entry.identifiers(), entry.reason);
            }
        }
        BlacklistAction::Show { url, uuid } => {
            if url.is_none() && uuid.is_none() {
                return Err(Error::validation("Either --url or --uuid is required").into());
            }
            let registry = ctx.open()?;
            let entries = registry.blacklist_find(url.as_deref(), uuid.as_deref());
            if entries.is_empty() {
                let identifier = uuid.or(url).unwrap_or_default();
                return Err(Error::not_found("Blacklist entry", identifier).into());
            }
            for (i, entry) in entries.into_iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print_blacklist_entry(entry);
            }
        }
    }
    Ok(())
}

fn print_blacklist_entry(entry: &BlacklistEntry) {
    if let Some(uuid) = &entry.uuid {
        println!("UUID: {}", uuid);
    }
    if let Some(url) = &entry.url {
        println!("URL: {}", url);
    }
    if let Some(url_regex) = &entry.url_regex {
        println!("URL Regex: {}", url_regex);
    }
    println!("Reason: {}", entry.reason);
    println!("Blacklisted at: {}", entry.blacklisted_at.to_rfc3339());
}

fn cmd_validate(ctx: &Context) -> anyhow::Result<()> {
    let registry = Registry::load(&ctx.registry_path)?;
    let errors = registry.validate_registry(ctx.schema());
    if !errors.is_empty() {
        return Err(Error::Validation(errors).into());
    }
    println!(
        "Registry valid: {} plugins, {} blacklist entries",
        registry.plugins.len(),
        registry.blacklist.len()
    );
    Ok(())
}

fn cmd_stats(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let stats = RegistryStats::collect(&ctx.open()?);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Total plugins: {}", stats.total_plugins);
    println!("Blacklist entries: {}", stats.blacklist_entries);
    println!();
    println!("By trust level:");
    for (trust_level, count) in &stats.by_trust_level {
        println!("  {}: {}", trust_level, count);
    }
    println!();
    println!("By category:");
    for (category, count) in &stats.by_category {
        println!("  {}: {}", category, count);
    }
    Ok(())
}

fn cmd_output(ctx: &Context, format: RegistryFormat) -> anyhow::Result<()> {
    print!("{}", ctx.open()?.render(format)?);
    Ok(())
}

fn cmd_config(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for key in Config::keys() {
                println!("{} = {}", key, config.get(key)?);
            }
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path()?.display());
        }
    }
    Ok(())
}
