use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teach_portal::admin::AdminGate;
use teach_portal::catalog::{
    CatalogFilter, CatalogRepository, CatalogView, HtmlUpload, MemoryBackend, ResourcePatch,
    TeachingPatch, TeachingUpload, ToolUpload, UNIVERSAL_GRADE, UploadFile, Zone, find_category,
    find_grade,
};
use teach_portal::config::Config;
use teach_portal::search::{
    FileHistoryStorage, InitialsTable, SearchHistoryStore, SearchMatcher, highlight_match,
    render_marked,
};
use teach_portal::{logging, proxy};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "teach-portal", version, about = "Teaching resource portal")]
struct Cli {
    /// Config file (default: <data_dir>/teach-portal/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use an in-memory catalog seeded from this JSON file instead of the backend
    #[arg(long, global = true)]
    offline: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTML proxy server
    Serve,

    /// Search the resource catalog
    Search(SearchArgs),

    /// Show or edit the search history
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },

    /// List teaching documents
    Teaching {
        /// Zone id or label (standard, textbook, plan, courseware)
        #[arg(long)]
        zone: Option<String>,

        #[arg(long)]
        refresh: bool,
    },

    /// Catalog administration
    Admin {
        #[arg(long)]
        password: String,

        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Query text; empty lists everything
    #[arg(default_value = "")]
    query: String,

    /// Category id or label
    #[arg(long)]
    category: Option<String>,

    /// Grade id (1-6) or label
    #[arg(long)]
    grade: Option<String>,

    /// Show the empowerment category instead of interactive tools
    #[arg(long)]
    empowerment: bool,

    /// Bypass the listing cache
    #[arg(long)]
    refresh: bool,

    /// Do not record the query in the search history
    #[arg(long)]
    no_history: bool,

    #[arg(long, default_value_t = 20)]
    limit: usize,
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    List,
    Remove { query: String },
    Clear,
}

#[derive(Args, Debug)]
struct ResourceFields {
    #[arg(long)]
    title: String,

    #[arg(long, default_value = "")]
    description: String,

    /// Category id or label
    #[arg(long)]
    category: String,

    /// Grade id or label
    #[arg(long, default_value = UNIVERSAL_GRADE)]
    grade: String,

    /// Cover image
    #[arg(long)]
    cover: PathBuf,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    /// Upload an HTML document with its cover
    UploadHtml {
        #[command(flatten)]
        fields: ResourceFields,

        file: PathBuf,
    },

    /// Register an in-app tool route
    AddTool {
        #[command(flatten)]
        fields: ResourceFields,

        #[arg(long)]
        route: String,
    },

    /// Edit a resource
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        grade: Option<String>,
        #[arg(long)]
        cover: Option<PathBuf>,
    },

    /// Delete a resource and its stored files
    Delete { id: String },

    /// Upload a teaching document into a zone
    UploadTeaching {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        zone: String,
        file: PathBuf,
    },

    /// Edit a teaching document
    EditTeaching {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        zone: Option<String>,
    },

    /// Delete a teaching document and its stored file
    DeleteTeaching { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let _guard = logging::init(&config.logging);

    match cli.command {
        Command::Serve => {
            info!("Starting HTML proxy on {}", config.proxy.bind);
            proxy::serve(&config.proxy).await
        }
        Command::Search(args) => {
            let repo = open_repository(&config, cli.offline.as_deref())?;
            run_search(&config, &repo, args).await
        }
        Command::History { action } => {
            run_history(&config, action.unwrap_or(HistoryAction::List));
            Ok(())
        }
        Command::Teaching { zone, refresh } => {
            let repo = open_repository(&config, cli.offline.as_deref())?;
            let zone = zone.as_deref().map(parse_zone).transpose()?;
            run_teaching(&repo, zone, refresh).await
        }
        Command::Admin { password, action } => {
            let gate = AdminGate::from_config(&config.admin);
            if !gate.verify(&password) {
                anyhow::bail!("Wrong admin password");
            }
            let repo = open_repository(&config, cli.offline.as_deref())?;
            run_admin(&repo, action).await
        }
    }
}

fn open_repository(config: &Config, offline: Option<&Path>) -> Result<CatalogRepository> {
    match offline {
        Some(seed) => {
            let backend = Arc::new(MemoryBackend::load_seed(seed)?);
            Ok(
                CatalogRepository::new(backend.clone(), backend, config.cache.ttl()).with_buckets(
                    config.backend.apps_bucket.clone(),
                    config.backend.teaching_bucket.clone(),
                ),
            )
        }
        None => {
            config.require_backend()?;
            Ok(CatalogRepository::from_config(config)?)
        }
    }
}

fn history_store(config: &Config) -> SearchHistoryStore<FileHistoryStorage> {
    SearchHistoryStore::with_capacity(
        FileHistoryStorage::new(config.history.resolved_path()),
        config.history.capacity,
    )
}

fn build_matcher(config: &Config) -> Result<SearchMatcher> {
    let mut initials = InitialsTable::builtin();
    if let Some(path) = &config.search.initials_file {
        initials.extend(InitialsTable::load(path)?);
    }
    Ok(SearchMatcher::new(initials))
}

async fn run_search(config: &Config, repo: &CatalogRepository, args: SearchArgs) -> Result<()> {
    let view = if args.empowerment {
        CatalogView::Empowerment
    } else {
        CatalogView::Interactive
    };
    let mut filter = CatalogFilter::new(view).query(args.query.clone());
    if let Some(category) = &args.category {
        let option = find_category(category)
            .with_context(|| format!("Unknown category: {category}"))?;
        filter = filter.category(option);
    }
    if let Some(grade) = &args.grade {
        let option = find_grade(grade).with_context(|| format!("Unknown grade: {grade}"))?;
        filter = filter.grade(option);
    }

    let matcher = build_matcher(config)?;
    let resources = repo.list_resources(args.refresh).await?;
    let ranked = filter.apply(&matcher, resources);

    if !args.no_history {
        history_store(config).add(&args.query);
    }

    if ranked.is_empty() {
        println!("No matching resources");
        return Ok(());
    }

    println!("{} result(s)", ranked.len());
    for (index, hit) in ranked.iter().take(args.limit).enumerate() {
        let resource = &hit.item;
        let title = render_marked(&highlight_match(&resource.title, &args.query), "[", "]");
        println!(
            "{:>3}. {}  ({} / {})  score {:.0}",
            index + 1,
            title,
            resource.category,
            resource.grade,
            hit.score
        );
        if !resource.description.is_empty() {
            let description =
                render_marked(&highlight_match(&resource.description, &args.query), "[", "]");
            println!("     {description}");
        }
        println!("     -> {}   id={}", resource.launch_target(), resource.id);
    }
    Ok(())
}

fn run_history(config: &Config, action: HistoryAction) {
    let store = history_store(config);
    match action {
        HistoryAction::List => {
            let entries = store.list();
            if entries.is_empty() {
                println!("No search history");
            }
            for entry in entries {
                println!("{entry}");
            }
        }
        HistoryAction::Remove { query } => store.remove(&query),
        HistoryAction::Clear => store.clear(),
    }
}

async fn run_teaching(repo: &CatalogRepository, zone: Option<Zone>, refresh: bool) -> Result<()> {
    let documents = repo.list_teaching(zone, refresh).await?;
    if documents.is_empty() {
        println!("No teaching documents");
        return Ok(());
    }
    for document in documents {
        println!(
            "[{}] {} ({})  id={}\n     {}",
            document.zone.label(),
            document.title,
            document.file_type,
            document.id,
            document.file_url
        );
    }
    Ok(())
}

fn parse_zone(value: &str) -> Result<Zone> {
    Zone::parse(value).with_context(|| format!("Unknown zone: {value}"))
}

/// Category label for an id or label; unknown values are kept as typed
fn category_label(value: &str) -> String {
    find_category(value)
        .map(|c| c.label.to_string())
        .unwrap_or_else(|| value.trim().to_string())
}

fn grade_label(value: &str) -> String {
    find_grade(value)
        .map(|g| g.label.to_string())
        .unwrap_or_else(|| value.trim().to_string())
}

async fn read_upload(path: &Path) -> Result<UploadFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {path:?}"))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file path: {path:?}"))?;
    Ok(UploadFile::new(name, bytes))
}

async fn run_admin(repo: &CatalogRepository, action: AdminAction) -> Result<()> {
    match action {
        AdminAction::UploadHtml { fields, file } => {
            let created = repo
                .upload_html_resource(HtmlUpload {
                    title: fields.title,
                    description: fields.description,
                    category: category_label(&fields.category),
                    grade: grade_label(&fields.grade),
                    document: read_upload(&file).await?,
                    cover: read_upload(&fields.cover).await?,
                })
                .await?;
            println!("Uploaded '{}' (id {})", created.title, created.id);
        }
        AdminAction::AddTool { fields, route } => {
            let created = repo
                .create_tool_resource(ToolUpload {
                    title: fields.title,
                    description: fields.description,
                    category: category_label(&fields.category),
                    grade: grade_label(&fields.grade),
                    route_path: route,
                    cover: read_upload(&fields.cover).await?,
                })
                .await?;
            println!("Added tool '{}' (id {})", created.title, created.id);
        }
        AdminAction::Edit {
            id,
            title,
            description,
            category,
            grade,
            cover,
        } => {
            let patch = ResourcePatch {
                title,
                description,
                category: category.as_deref().map(category_label),
                grade: grade.as_deref().map(grade_label),
                image_url: None,
            };
            let cover = match cover {
                Some(path) => Some(read_upload(&path).await?),
                None => None,
            };
            let updated = repo.update_resource(&id, patch, cover).await?;
            println!("Saved '{}'", updated.title);
        }
        AdminAction::Delete { id } => {
            let resource = repo.find_resource(&id).await?;
            repo.delete_resource(&resource).await?;
            println!("Deleted '{}'", resource.title);
        }
        AdminAction::UploadTeaching {
            title,
            description,
            zone,
            file,
        } => {
            let created = repo
                .upload_teaching(TeachingUpload {
                    title,
                    description,
                    zone: parse_zone(&zone)?,
                    file: read_upload(&file).await?,
                })
                .await?;
            println!(
                "Uploaded '{}' to {} (id {})",
                created.title, created.zone, created.id
            );
        }
        AdminAction::EditTeaching {
            id,
            title,
            description,
            zone,
        } => {
            let patch = TeachingPatch {
                title,
                description,
                zone: zone.as_deref().map(parse_zone).transpose()?,
            };
            let updated = repo.update_teaching(&id, patch).await?;
            println!("Saved '{}'", updated.title);
        }
        AdminAction::DeleteTeaching { id } => {
            let document = repo.find_teaching(&id).await?;
            repo.delete_teaching(&document).await?;
            println!("Deleted '{}'", document.title);
        }
    }
    Ok(())
}
