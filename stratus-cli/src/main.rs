use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use colored::Colorize;

use stratus_core::differ::{create_plan, destroy_plan};
use stratus_core::effect::Effect;
use stratus_core::plan::Plan;
use stratus_core::provider::{Provider, ProviderError, ProviderResult};
use stratus_core::resource::{Resource, ResourceId, State, Value};
use stratus_core::resource_id::{ResourceIdentifier, ScopeId};
use stratus_core::schema::ResourceSchema;
use stratus_provider_azurerm::registration::resource_types;
use stratus_provider_azurerm::services::consumption::BudgetId;
use stratus_provider_azurerm::services::dns::DnsZoneId;
use stratus_provider_azurerm::services::policy::{PolicyAssignmentId, RemediationId};
use stratus_provider_azurerm::services::postgres::ServerId;
use stratus_provider_azurerm::services::web::ServicePlanId;
use stratus_provider_azurerm::{AzureRmProvider, ProviderConfig};
use stratus_state::{StateBackend, StateFile, create_backend};

mod config;

use config::Configuration;

const DEFAULT_CONFIG: &str = "stratus.json";

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Declarative management of Azure resources", long_about = None)]
struct Cli {
    /// Log more (-v for info, -vv for debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate {
        /// Path to the JSON configuration
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        /// Path to the JSON configuration
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        /// Path to the JSON configuration
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Destroy every resource recorded in state
    Destroy {
        /// Path to the JSON configuration
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Adopt an existing Azure resource into state
    Import {
        /// Address in the configuration, e.g. azurerm_dns_zone.main
        address: String,

        /// Azure resource ID of the existing object
        id: String,

        /// Path to the JSON configuration
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Parse a resource ID and show its segments
    Id {
        #[arg(value_enum)]
        kind: IdKind,

        id: String,

        /// Match literal segments case-insensitively, as for IDs returned by the API
        #[arg(long)]
        insensitive: bool,
    },
    /// List supported resource and data source types
    Resources,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum IdKind {
    Budget,
    DnsZone,
    PostgresqlServer,
    ServicePlan,
    PolicyAssignment,
    PolicyRemediation,
    Scope,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&file).await,
        Commands::Apply { file } => run_apply(&file).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&file, auto_approve).await,
        Commands::Import { address, id, file } => run_import(&file, &address, &id).await,
        Commands::Id {
            kind,
            id,
            insensitive,
        } => run_id(kind, &id, insensitive),
        Commands::Resources => {
            run_resources();
            Ok(())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "stratus", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

// =============================================================================
// Configuration, provider and state
// =============================================================================

/// Schemas of managed resource types, keyed by type name
fn get_schemas() -> HashMap<String, ResourceSchema> {
    resource_types()
        .iter()
        .filter(|t| !t.is_data_source())
        .map(|t| (t.name().to_string(), t.schema()))
        .collect()
}

fn address(resource: &Resource) -> String {
    if resource.is_data_source() {
        format!("data.{}", resource.id)
    } else {
        resource.id.to_string()
    }
}

fn validate_resources(resources: &[Resource]) -> Result<(), String> {
    let types = resource_types();
    let mut all_errors = Vec::new();

    for resource in resources {
        let kind = types.iter().find(|t| {
            t.name() == resource.id.resource_type && t.is_data_source() == resource.is_data_source()
        });
        match kind {
            None => all_errors.push(format!(
                "{}: unknown {} type {}",
                address(resource),
                if resource.is_data_source() {
                    "data source"
                } else {
                    "resource"
                },
                resource.id.resource_type
            )),
            Some(kind) => {
                if let Err(errors) = kind.validate(&resource.attributes) {
                    for error in errors {
                        all_errors.push(format!("{}: {}", address(resource), error));
                    }
                }
            }
        }
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(format!("Validation failed:\n  {}", all_errors.join("\n  ")))
    }
}

fn load_configuration(file: &Path) -> Result<(Configuration, Vec<Resource>), String> {
    let config = Configuration::load(file)?;
    let resources = config.resources();
    validate_resources(&resources)?;
    Ok((config, resources))
}

fn get_provider(config: &Configuration) -> Result<AzureRmProvider, String> {
    let settings = ProviderConfig::resolve(&config.provider)
        .map_err(|e| format!("Provider configuration error: {}", e))?;
    log::info!(
        "using subscription {} at {}",
        settings.subscription_id,
        settings.endpoint
    );
    AzureRmProvider::new(&settings).map_err(|e| format!("Failed to create provider: {}", e))
}

async fn get_backend(config: &Configuration) -> Result<Box<dyn StateBackend>, String> {
    let backend = create_backend(&config.backend_config()).map_err(|e| e.to_string())?;
    backend.init().await.map_err(|e| e.to_string())?;
    Ok(backend)
}

async fn read_state(backend: &dyn StateBackend) -> Result<StateFile, String> {
    Ok(backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default())
}

/// Read every recorded resource from Azure, keeping values the API never returns
async fn refresh(
    provider: &AzureRmProvider,
    state: &StateFile,
    schemas: &HashMap<String, ResourceSchema>,
) -> Result<Vec<State>, String> {
    let mut refreshed = Vec::with_capacity(state.resources.len());
    for stored in &state.resources {
        let id = stored.id();
        let mut current = provider
            .read(&id, stored.identifier.as_deref())
            .await
            .map_err(|e| format!("Failed to refresh {}: {}", id, e))?;
        if current.exists
            && let Some(schema) = schemas.get(&id.resource_type)
        {
            schema.carry_over_write_only(&stored.values(), &mut current.attributes);
        }
        refreshed.push(current);
    }
    Ok(refreshed)
}

/// Refresh state, then diff the configuration against it
async fn create_plan_from_config(
    provider: &AzureRmProvider,
    resources: &[Resource],
    state: &StateFile,
) -> Result<(Plan, Vec<State>), String> {
    let schemas = get_schemas();
    let refreshed = refresh(provider, state, &schemas).await?;
    let current_states: HashMap<ResourceId, State> = refreshed
        .iter()
        .map(|s| (s.id.clone(), s.clone()))
        .collect();

    let mut desired = resources.to_vec();
    for resource in desired.iter_mut().filter(|r| !r.is_data_source()) {
        if let Some(schema) = schemas.get(&resource.id.resource_type) {
            schema.apply_defaults(&mut resource.attributes);
        }
    }

    Ok((create_plan(&desired, &current_states, &schemas), refreshed))
}

/// Run `operation` while holding the state lock
async fn with_lock<T>(
    backend: &dyn StateBackend,
    operation: &str,
    run: impl std::future::Future<Output = Result<T, String>>,
) -> Result<T, String> {
    let lock = backend
        .acquire_lock(operation)
        .await
        .map_err(|e| e.to_string())?;
    log::debug!("acquired state lock {}", lock.id);

    let result = run.await;

    if let Err(e) = backend.release_lock(&lock).await {
        let message = format!("Failed to release state lock {}: {}", lock.id, e);
        return match result {
            Ok(_) => Err(message),
            Err(original) => {
                log::error!("{}", message);
                Err(original)
            }
        };
    }
    result
}

async fn write_state(backend: &dyn StateBackend, state: &mut StateFile) -> Result<(), String> {
    state.increment_serial();
    backend
        .write_state(state)
        .await
        .map_err(|e| format!("Failed to write state: {}", e))
}

// =============================================================================
// Commands
// =============================================================================

fn run_validate(file: &Path) -> Result<(), String> {
    println!("{}", "Validating...".cyan());

    let (_, resources) = load_configuration(file)?;

    println!(
        "{}",
        format!("✓ {} resources validated successfully.", resources.len())
            .green()
            .bold()
    );

    for resource in &resources {
        println!("  • {}", address(resource));
    }

    Ok(())
}

async fn run_plan(file: &Path) -> Result<(), String> {
    let (config, resources) = load_configuration(file)?;
    let provider = get_provider(&config)?;
    let backend = get_backend(&config).await?;
    let state = read_state(backend.as_ref()).await?;

    let (plan, _) = create_plan_from_config(&provider, &resources, &state).await?;
    print_plan(&plan, &get_schemas());
    Ok(())
}

async fn run_apply(file: &Path) -> Result<(), String> {
    let (config, resources) = load_configuration(file)?;
    let provider = get_provider(&config)?;
    let backend = get_backend(&config).await?;

    with_lock(
        backend.as_ref(),
        "apply",
        apply_locked(&provider, backend.as_ref(), &resources),
    )
    .await
}

async fn apply_locked(
    provider: &AzureRmProvider,
    backend: &dyn StateBackend,
    resources: &[Resource],
) -> Result<(), String> {
    let mut state = read_state(backend).await?;
    let (plan, refreshed) = create_plan_from_config(provider, resources, &state).await?;
    for current in &refreshed {
        state.record(provider.name(), current);
    }

    print_plan(&plan, &get_schemas());

    if plan.is_empty() {
        return write_state(backend, &mut state).await;
    }

    println!();
    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let mut success_count = 0;
    let mut failure = None;

    for effect in plan.effects() {
        match apply_effect(provider, effect, &mut state).await {
            Ok(()) => {
                println!("  {} {}", "✓".green(), format_effect(effect));
                if effect.is_mutating() {
                    success_count += 1;
                }
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), format_effect(effect), e);
                failure = Some(e);
                break;
            }
        }
    }

    write_state(backend, &mut state).await?;

    println!();
    match failure {
        None => {
            println!(
                "{}",
                format!("Apply complete! {} changes applied.", success_count)
                    .green()
                    .bold()
            );
            Ok(())
        }
        Some(e) => {
            println!(
                "{}",
                format!(
                    "Apply failed after {} of {} changes.",
                    success_count,
                    plan.mutation_count()
                )
                .red()
                .bold()
            );
            Err(e.to_string())
        }
    }
}

fn recorded_identifier(id: &ResourceId, state: &State) -> ProviderResult<String> {
    state.identifier.clone().ok_or_else(|| {
        ProviderError::new("no Azure resource ID recorded in state").for_resource(id.clone())
    })
}

/// Perform one Effect and record its outcome in `state`
async fn apply_effect(
    provider: &AzureRmProvider,
    effect: &Effect,
    state: &mut StateFile,
) -> ProviderResult<()> {
    match effect {
        Effect::Read(resource) => {
            let found = provider.read_data_source(resource).await?;
            if let Some(identifier) = &found.identifier {
                log::info!("{} resolved to {}", address(resource), identifier);
            }
        }
        Effect::Create(resource) => {
            let created = provider.create(resource).await?;
            state.record(provider.name(), &created);
        }
        Effect::Update { id, from, to, .. } => {
            let identifier = recorded_identifier(id, from)?;
            let updated = provider.update(id, &identifier, from, to).await?;
            state.record(provider.name(), &updated);
        }
        Effect::Replace { id, from, to, .. } => {
            let identifier = recorded_identifier(id, from)?;
            provider.delete(id, &identifier).await?;
            state.record(provider.name(), &State::not_found(id.clone()));
            let created = provider.create(to).await?;
            state.record(provider.name(), &created);
        }
        Effect::Delete { id, identifier } => {
            provider.delete(id, identifier).await?;
            state.record(provider.name(), &State::not_found(id.clone()));
        }
    }
    Ok(())
}

async fn run_destroy(file: &Path, auto_approve: bool) -> Result<(), String> {
    let config = Configuration::load(file)?;
    let provider = get_provider(&config)?;
    let backend = get_backend(&config).await?;

    with_lock(
        backend.as_ref(),
        "destroy",
        destroy_locked(&provider, backend.as_ref(), auto_approve),
    )
    .await
}

async fn destroy_locked(
    provider: &AzureRmProvider,
    backend: &dyn StateBackend,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state = read_state(backend).await?;
    let recorded: Vec<State> = state.resources.iter().map(|r| r.to_state()).collect();
    let plan = destroy_plan(&recorded);

    if plan.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for effect in plan.effects() {
        println!("  {} {}", "-".red().bold(), effect.resource_id());
    }
    println!();
    println!(
        "Plan: {} to destroy.",
        plan.mutation_count().to_string().red()
    );
    println!();

    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!();
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let mut success_count = 0;
    let mut failure = None;
    for effect in plan.effects() {
        match apply_effect(provider, effect, &mut state).await {
            Ok(()) => {
                println!("  {} {}", "✓".green(), format_effect(effect));
                success_count += 1;
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), format_effect(effect), e);
                failure = Some(e);
                break;
            }
        }
    }

    write_state(backend, &mut state).await?;

    println!();
    match failure {
        None => {
            println!(
                "{}",
                format!("Destroy complete! {} resources destroyed.", success_count)
                    .green()
                    .bold()
            );
            Ok(())
        }
        Some(e) => {
            println!(
                "{}",
                format!(
                    "Destroy failed after {} of {} resources.",
                    success_count,
                    plan.mutation_count()
                )
                .red()
                .bold()
            );
            Err(e.to_string())
        }
    }
}

fn confirm(question: &str) -> Result<bool, String> {
    println!("{}", question.yellow().bold());
    println!(
        "  {}",
        "This action cannot be undone. Type 'yes' to confirm.".yellow()
    );
    print!("\n  Enter a value: ");
    io::stdout().flush().map_err(|e| e.to_string())?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    Ok(input.trim() == "yes")
}

async fn run_import(file: &Path, address: &str, azure_id: &str) -> Result<(), String> {
    let id = ResourceId::parse_address(address)
        .ok_or_else(|| format!("Invalid address {:?}: expected <type>.<name>", address))?;
    let config = Configuration::load(file)?;
    let provider = get_provider(&config)?;
    let backend = get_backend(&config).await?;

    with_lock(
        backend.as_ref(),
        "import",
        import_locked(&provider, backend.as_ref(), &config, file, &id, azure_id),
    )
    .await
}

async fn import_locked(
    provider: &AzureRmProvider,
    backend: &dyn StateBackend,
    config: &Configuration,
    file: &Path,
    id: &ResourceId,
    azure_id: &str,
) -> Result<(), String> {
    let mut state = read_state(backend).await?;
    if state.find_resource(id).is_some() {
        return Err(format!(
            "{} is already managed; remove it from state before importing",
            id
        ));
    }

    println!("{} {} from {}", "Importing".cyan(), id, azure_id);
    let imported = provider
        .import(id, azure_id)
        .await
        .map_err(|e| format!("Import failed: {}", e))?;
    if !imported.exists {
        return Err(format!(
            "Cannot import non-existent remote object {}",
            azure_id
        ));
    }

    state.record(provider.name(), &imported);
    write_state(backend, &mut state).await?;

    println!("{}", format!("✓ Imported {}", id).green().bold());
    if !config.is_declared(id) {
        println!(
            "  {}",
            format!(
                "{} is not declared in {}; the next apply will delete it.",
                id,
                file.display()
            )
            .yellow()
        );
    }
    Ok(())
}

fn run_id(kind: IdKind, input: &str, insensitive: bool) -> Result<(), String> {
    let (canonical, segments) = describe_id(kind, input, insensitive)?;
    println!("{}", "✓ Valid resource ID".green().bold());
    println!("  {}", canonical);
    println!();
    println!("{}", segments);
    Ok(())
}

fn describe_id(kind: IdKind, input: &str, insensitive: bool) -> Result<(String, String), String> {
    match kind {
        IdKind::Budget => describe::<BudgetId>(input, insensitive),
        IdKind::DnsZone => describe::<DnsZoneId>(input, insensitive),
        IdKind::PostgresqlServer => describe::<ServerId>(input, insensitive),
        IdKind::ServicePlan => describe::<ServicePlanId>(input, insensitive),
        IdKind::PolicyAssignment => describe::<PolicyAssignmentId>(input, insensitive),
        IdKind::PolicyRemediation => describe::<RemediationId>(input, insensitive),
        IdKind::Scope => {
            let scope = if insensitive {
                ScopeId::parse_insensitively(input)
            } else {
                ScopeId::parse(input)
            }
            .map_err(|e| e.to_string())?;
            Ok((scope.id(), scope.to_string()))
        }
    }
}

fn describe<T: ResourceIdentifier + std::fmt::Display>(
    input: &str,
    insensitive: bool,
) -> Result<(String, String), String> {
    let id = if insensitive {
        T::parse_insensitively(input)
    } else {
        T::parse(input)
    }
    .map_err(|e| e.to_string())?;
    Ok((id.id(), id.to_string()))
}

fn run_resources() {
    println!("{}", "Supported types:".cyan().bold());
    println!();
    for kind in resource_types() {
        let label = if kind.is_data_source() {
            "data source"
        } else {
            "resource"
        };
        println!("  • {} ({})", kind.name().bold(), label);
        if let Some(format) = kind.id_format() {
            println!("      {}", format.dimmed());
        }
    }
}

// =============================================================================
// Plan display
// =============================================================================

fn print_plan(plan: &Plan, schemas: &HashMap<String, ResourceSchema>) {
    if plan.mutation_count() == 0 {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        let colored_symbol = match effect {
            Effect::Read(_) => effect.symbol().cyan().bold(),
            Effect::Create(_) => effect.symbol().green().bold(),
            Effect::Update { .. } => effect.symbol().yellow().bold(),
            Effect::Replace { .. } => effect.symbol().magenta().bold(),
            Effect::Delete { .. } => effect.symbol().red().bold(),
        };
        println!("  {} {}", colored_symbol, format_effect(effect));

        match effect {
            Effect::Create(resource) => {
                let schema = schemas.get(&resource.id.resource_type);
                let mut keys: Vec<&String> = resource.attributes.keys().collect();
                keys.sort();
                for key in keys {
                    println!(
                        "      {}: {}",
                        key,
                        format_attribute(schema, key, &resource.attributes[key])
                    );
                }
            }
            Effect::Update {
                id,
                from,
                to,
                changed_attributes,
            }
            | Effect::Replace {
                id,
                from,
                to,
                changed_attributes,
            } => {
                let schema = schemas.get(&id.resource_type);
                for key in changed_attributes {
                    let old = from.attributes.get(key);
                    let Some(new) = to.attributes.get(key) else {
                        continue;
                    };
                    let forces = schema
                        .and_then(|s| s.attributes.get(key))
                        .is_some_and(|a| a.requires_replacement(old, new));
                    println!(
                        "      {}: {} → {}{}",
                        key,
                        old.map(|v| format_attribute(schema, key, v))
                            .unwrap_or_else(|| "(none)".to_string()),
                        format_attribute(schema, key, new),
                        if forces {
                            " (forces replacement)".red().to_string()
                        } else {
                            String::new()
                        }
                    );
                }
            }
            Effect::Read(_) | Effect::Delete { .. } => {}
        }
    }

    println!();
    println!("{}", plan.summary());
}

fn format_effect(effect: &Effect) -> String {
    match effect {
        Effect::Read(resource) => address(resource),
        _ => effect.resource_id().to_string(),
    }
}

fn format_attribute(schema: Option<&ResourceSchema>, key: &str, value: &Value) -> String {
    let hidden = schema
        .and_then(|s| s.attributes.get(key))
        .is_some_and(|a| a.sensitive || a.write_only);
    if hidden {
        "(sensitive)".to_string()
    } else {
        format_value(value)
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let strs: Vec<_> = entries
                .into_iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_verbosity_and_destroy_flags() {
        let cli = Cli::try_parse_from(["stratus", "-vv", "destroy", "--auto-approve"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Destroy {
                auto_approve: true,
                ref file
            } if file == Path::new(DEFAULT_CONFIG)
        ));
    }

    #[test]
    fn format_value_is_stable() {
        let mut tags = HashMap::new();
        tags.insert("b".to_string(), Value::from("2"));
        tags.insert("a".to_string(), Value::from("1"));
        assert_eq!(format_value(&Value::Map(tags)), "{a: \"1\", b: \"2\"}");
        assert_eq!(
            format_value(&Value::List(vec![Value::Int(1), Value::Bool(true)])),
            "[1, true]"
        );
    }

    #[test]
    fn sensitive_attributes_are_masked() {
        let schemas = get_schemas();
        let schema = schemas.get("azurerm_postgresql_server");
        assert_eq!(
            format_attribute(schema, "administrator_login_password", &Value::from("hunter2")),
            "(sensitive)"
        );
        assert_eq!(
            format_attribute(schema, "sku_name", &Value::from("GP_Gen5_2")),
            "\"GP_Gen5_2\""
        );
    }

    #[test]
    fn describe_budget_id() {
        let input = "/providers/Microsoft.Management/managementGroups/12345678-1234-9876-4563-123456789012/providers/Microsoft.Consumption/budgets/budget1";
        let (canonical, segments) = describe_id(IdKind::Budget, input, false).unwrap();
        assert_eq!(canonical, input);
        assert!(segments.contains("budget1"));

        let upper = input.to_uppercase();
        assert!(describe_id(IdKind::Budget, &upper, false).is_err());
        assert!(describe_id(IdKind::Budget, &upper, true).is_ok());
    }

    #[test]
    fn describe_scope_id() {
        let (canonical, _) = describe_id(IdKind::Scope, "/subscriptions/sub/resourceGroups/rg", false).unwrap();
        assert_eq!(canonical, "/subscriptions/sub/resourceGroups/rg");
        assert!(describe_id(IdKind::DnsZone, "", false).is_err());
    }

    #[test]
    fn validation_reports_unknown_types_and_schema_errors() {
        let resources = vec![
            Resource::new("azurerm_virtual_network", "main"),
            Resource::new("azurerm_dns_zone", "zone"),
        ];
        let error = validate_resources(&resources).unwrap_err();
        assert!(error.contains("azurerm_virtual_network.main: unknown resource type"));
        assert!(error.contains("azurerm_dns_zone.zone:"));
    }
}
