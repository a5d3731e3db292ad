use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use crewmeal_rs::{
    attendance, auth,
    constants::SESSION_FILE,
    crew,
    data_backend::open_store,
    data_types::{
        DietaryProfile, MealStatus, Menu, Mood, Religion, RequestStatus, RequestType, Role,
        SessionState, WasteConfig,
    },
    errors::CrewMealError,
    extraction::Extractor,
    menus, requests,
    shared_main::{logger_init, App},
    waste,
};

/// Crew catering manager: meal plans, dietary alerts, galley service and waste logs.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// SQLite database file. Without it everything lives in memory for this run only.
    #[arg(long, env = "CREWMEAL_DB")]
    db: Option<PathBuf>,
    /// Where the session token is kept between runs
    #[arg(long, env = "CREWMEAL_SESSION", default_value = SESSION_FILE)]
    session_file: PathBuf,
    /// Gemini API key for menu and roster extraction
    #[arg(long, env = "GEMINI_API_KEY")]
    gemini_api_key: Option<String>,
    /// Gemini model{n}Example: 'gemini-3-flash-preview'
    #[arg(long, env = "GEMINI_MODEL")]
    gemini_model: Option<String>,
    /// Gemini API base URL
    #[arg(long, env = "GEMINI_HOST")]
    gemini_host: Option<String>,
    /// Enable verbose logging{n}[SETS env: RUST_LOG=debug]
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with a passport number
    Login {
        identifier: String,
        #[arg(short, long)]
        password: String,
    },
    /// Quick login for the officer, galley or admin account
    LoginAs {
        #[arg(value_parser = parse_role)]
        role: Role,
        #[arg(short, long)]
        password: String,
    },
    Logout,
    /// Show the signed-in user and pending gates
    Whoami,
    ChangePassword {
        new_password: String,
        confirmation: String,
    },
    /// Complete the dietary profile
    Onboard(ProfileArgs),
    /// Edit own name, rank or dietary profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        rank: Option<String>,
        #[command(flatten)]
        dietary: ProfileArgs,
    },
    #[command(subcommand)]
    Crew(CrewCommand),
    #[command(subcommand)]
    Menu(MenuCommand),
    /// Toggle a late plate for yourself
    LatePlate { menu_id: String },
    /// Toggle skipping a meal
    Skip { menu_id: String },
    /// Show your own status for a meal
    Status { menu_id: String },
    /// Galley: mark a crew member's plate as served
    Serve { menu_id: String, user_id: String },
    /// Galley: headcount and service list for a menu
    Service { menu_id: String },
    /// Show the current dietary alert
    Alert,
    /// Ask the galley to swap a conflicting item
    Substitute { original: String, alternative: String },
    #[command(subcommand)]
    Request(RequestCommand),
    Rate {
        menu_id: String,
        item_id: String,
        stars: u8,
        #[arg(value_parser = parse_mood)]
        mood: Mood,
        #[arg(default_value = "")]
        comment: String,
    },
    /// Like or unlike a dish
    Like { item_id: String },
    #[command(subcommand)]
    Notifications(NotificationCommand),
    #[command(subcommand)]
    Waste(WasteCommand),
}

#[derive(clap::Args, Debug)]
struct ProfileArgs {
    #[arg(long, value_parser = parse_religion)]
    religion: Option<Religion>,
    #[arg(long = "allergy")]
    allergies: Vec<String>,
    #[arg(long = "medical")]
    medical: Vec<String>,
    #[arg(long = "lifestyle")]
    lifestyle: Vec<String>,
    #[arg(long = "dislike")]
    dislikes: Vec<String>,
}

impl ProfileArgs {
    fn is_empty(&self) -> bool {
        self.religion.is_none()
            && self.allergies.is_empty()
            && self.medical.is_empty()
            && self.lifestyle.is_empty()
            && self.dislikes.is_empty()
    }

    fn into_profile(self) -> DietaryProfile {
        let mut profile = DietaryProfile {
            food_allergies: self.allergies,
            medical_restrictions: self.medical,
            lifestyle_preferences: self.lifestyle,
            dislikes: self.dislikes,
            ..Default::default()
        };
        profile.set_religion(self.religion.unwrap_or_default());
        profile
    }
}

#[derive(Subcommand, Debug)]
enum CrewCommand {
    List,
    Add {
        user_id: String,
        name: String,
        rank: String,
    },
    /// Import crew from a roster photo
    Import { image: PathBuf },
}

#[derive(Subcommand, Debug)]
enum MenuCommand {
    /// Menus for a day (today by default)
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Import a menu from a photo
    Import {
        image: PathBuf,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand, Debug)]
enum RequestCommand {
    Create {
        menu_id: String,
        #[arg(long, value_parser = parse_request_type, default_value = "absence")]
        kind: RequestType,
        #[arg(long, default_value = "")]
        detail: String,
    },
    /// Own requests, or pending ones for the galley
    List,
    Resolve {
        request_id: String,
        #[arg(value_parser = parse_decision)]
        decision: RequestStatus,
    },
}

#[derive(Subcommand, Debug)]
enum NotificationCommand {
    List,
    Read { id: String },
    Clear,
}

#[derive(Subcommand, Debug)]
enum WasteCommand {
    Log {
        containers: u32,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show or change the container standard
    Config {
        #[arg(long)]
        volume: Option<f64>,
        #[arg(long)]
        weight: Option<f64>,
    },
    /// Monthly totals
    Report,
}

fn parse_role(s: &str) -> Result<Role, String> {
    Role::parse(&s.to_lowercase()).ok_or_else(|| format!("unknown role '{s}'"))
}

fn parse_mood(s: &str) -> Result<Mood, String> {
    Mood::parse(&s.to_lowercase()).ok_or_else(|| "mood must be delicious, average or bad".to_string())
}

fn parse_religion(s: &str) -> Result<Religion, String> {
    Religion::parse(s).ok_or_else(|| format!("unknown religion '{s}'"))
}

fn parse_request_type(s: &str) -> Result<RequestType, String> {
    RequestType::parse(&s.to_lowercase()).ok_or_else(|| format!("unknown request type '{s}'"))
}

fn parse_decision(s: &str) -> Result<RequestStatus, String> {
    match s.to_lowercase().as_str() {
        "approve" | "approved" => Ok(RequestStatus::Approved),
        "deny" | "denied" => Ok(RequestStatus::Denied),
        _ => Err(format!("decision must be approve or deny, got '{s}'")),
    }
}

async fn save_token(path: &Path, app: &App) -> anyhow::Result<()> {
    if let Some(token) = app.token() {
        tokio::fs::write(path, token)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn print_session(state: &SessionState) {
    match state {
        SessionState::LoggedOut | SessionState::Authenticating => println!("Not signed in."),
        SessionState::PasswordResetRequired(user) => println!(
            "{} ({}): please set a new password with `change-password`.",
            user.name, user.user_id
        ),
        SessionState::OnboardingRequired(user) => println!(
            "{} ({}): please complete your dietary profile with `onboard`.",
            user.name, user.user_id
        ),
        SessionState::Active(user) => {
            println!("{} {} ({}, {})", user.rank, user.name, user.user_id, user.role)
        }
    }
}

fn print_menu(menu: &Menu, liked: &[String]) {
    let heart = |item_id: &str| if liked.iter().any(|id| id == item_id) { " ♥" } else { "" };

    println!(
        "[{}] {} {} ({}){}",
        menu.menu_id,
        menu.date,
        menu.meal_type,
        menu.meal_type.timing(),
        if menu.is_high_calorie() {
            format!(" - high calorie, {} kcal", menu.total_calories())
        } else {
            format!(" - {} kcal", menu.total_calories())
        }
    );
    for item in &menu.items {
        println!(
            "  {:<12} {} ({} kcal){}",
            item.item_id,
            item.name,
            item.estimated_calories,
            heart(&item.item_id)
        );
    }
    for item in &menu.alternatives {
        println!("  {:<12} alt: {}{}", item.item_id, item.name, heart(&item.item_id));
    }
}

fn status_label(status: MealStatus) -> &'static str {
    match status {
        MealStatus::Standard => "standard",
        MealStatus::LatePlate => "late plate (keep in warmer)",
        MealStatus::Served => "served",
        MealStatus::Skipped => "skipped",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }

    logger_init(module_path!());

    let store = open_store(args.db.as_deref())?;
    crew::seed_defaults(store.as_ref()).await?;

    let extractor = Extractor::new(args.gemini_api_key, args.gemini_model, args.gemini_host);
    let mut app = App::new(store, extractor);

    if let Ok(token) = tokio::fs::read_to_string(&args.session_file).await {
        auth::restore_session(&mut app, token.trim()).await?;
    }

    match args.command {
        Command::Login {
            identifier,
            password,
        } => {
            let state = auth::sign_in(&mut app, &identifier, &password).await?;
            print_session(state);
            save_token(&args.session_file, &app).await?;
        }
        Command::LoginAs { role, password } => {
            let state = auth::sign_in_as_role(&mut app, role, &password).await?;
            print_session(state);
            save_token(&args.session_file, &app).await?;
        }
        Command::Logout => {
            auth::logout(&mut app).await?;
            if args.session_file.exists() {
                tokio::fs::remove_file(&args.session_file).await?;
            }
            println!("Signed out.");
        }
        Command::Whoami => print_session(app.session()),
        Command::ChangePassword {
            new_password,
            confirmation,
        } => {
            let state = auth::change_password(&mut app, &new_password, &confirmation).await?;
            print_session(state);
        }
        Command::Onboard(profile) => {
            let state = auth::complete_onboarding(&mut app, profile.into_profile()).await?;
            print_session(state);
        }
        Command::Profile {
            name,
            rank,
            dietary,
        } => {
            let dietary = if dietary.is_empty() {
                None
            } else {
                Some(dietary.into_profile())
            };
            let user =
                crew::update_profile(&mut app, name.as_deref(), rank.as_deref(), dietary).await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Crew(CrewCommand::List) => {
            for user in crew::list_crew(&app).await? {
                println!(
                    "{:<12} {:<28} {:<16} {}",
                    user.user_id, user.name, user.rank, user.role
                );
            }
        }
        Command::Crew(CrewCommand::Add {
            user_id,
            name,
            rank,
        }) => {
            let user = crew::provision_user(&app, &user_id, &name, &rank).await?;
            println!("Added {} ({}).", user.name, user.user_id);
        }
        Command::Crew(CrewCommand::Import { image }) => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("reading {}", image.display()))?;
            let imported = crew::import_roster_image(&app, &bytes).await?;
            println!("Successfully imported {} crew members!", imported.len());
        }
        Command::Menu(MenuCommand::List { date }) => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let day = menus::menus_for_date(&app, date).await?;
            if day.is_empty() {
                println!("No menus scheduled for {date}.");
            }
            let liked = menus::liked_items(&app).await?;
            for menu in &day {
                print_menu(menu, &liked);
            }
        }
        Command::Menu(MenuCommand::Import { image, date }) => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("reading {}", image.display()))?;
            let menu = menus::import_menu_image(&mut app, &bytes, date).await?;
            print_menu(&menu, &[]);
        }
        Command::LatePlate { menu_id } => {
            let status = attendance::toggle_late_plate(&app, &menu_id).await?;
            println!("{menu_id}: {}", status_label(status));
        }
        Command::Skip { menu_id } => {
            let status = attendance::toggle_skip(&app, &menu_id).await?;
            println!("{menu_id}: {}", status_label(status));
        }
        Command::Status { menu_id } => {
            let status = attendance::my_status(&app, &menu_id).await?;
            println!("{menu_id}: {}", status_label(status));
        }
        Command::Serve { menu_id, user_id } => {
            let status = attendance::mark_served(&app, &menu_id, &user_id).await?;
            println!("{user_id} on {menu_id}: {}", status_label(status));
        }
        Command::Service { menu_id } => {
            let list = attendance::service_list(&app, &menu_id).await?;
            println!(
                "Total {} | served {} | late plates {} | pending {}",
                list.headcount.total,
                list.headcount.served,
                list.headcount.late_plates,
                list.headcount.pending
            );
            for entry in list.entries {
                let warning = match entry.conflicts.first() {
                    Some(item) if entry.status != MealStatus::Served => {
                        format!("  Restricted Item: {}", item.name)
                    }
                    _ => String::new(),
                };
                println!(
                    "{:<12} {:<28} {}{}",
                    entry.user.user_id,
                    entry.user.name,
                    status_label(entry.status),
                    warning
                );
            }
        }
        Command::Alert => match app.alert() {
            Some(alert) => {
                println!(
                    "Dietary conflict on {} {}:",
                    alert.menu.date, alert.menu.meal_type
                );
                for item in &alert.conflicting_items {
                    println!("  {}", item.name);
                }
                for item in alert.alternatives() {
                    println!("  alternative: {}", item.name);
                }
            }
            None => println!("No dietary conflicts."),
        },
        Command::Substitute {
            original,
            alternative,
        } => {
            let request = requests::request_substitution(&mut app, &original, &alternative).await?;
            println!("Request {} sent to the galley.", request.request_id);
        }
        Command::Request(RequestCommand::Create {
            menu_id,
            kind,
            detail,
        }) => {
            let request = requests::create_request(&app, &menu_id, kind, &detail).await?;
            println!("Request {} is pending.", request.request_id);
        }
        Command::Request(RequestCommand::List) => {
            let list = match requests::pending_requests(&app).await {
                Ok(pending) => pending,
                Err(CrewMealError::Forbidden { .. }) => {
                    requests::my_requests(&app).await?
                }
                Err(e) => return Err(e.into()),
            };
            for request in list {
                println!(
                    "{} {:<8} {:<12} {} {} {}",
                    request.request_id,
                    request.status.as_str(),
                    request.kind.as_str(),
                    request.user_id,
                    request.menu_id,
                    request.detail
                );
            }
        }
        Command::Request(RequestCommand::Resolve {
            request_id,
            decision,
        }) => {
            let request = requests::resolve_request(&app, &request_id, decision).await?;
            println!("Request {} {}.", request.request_id, request.status);
        }
        Command::Rate {
            menu_id,
            item_id,
            stars,
            mood,
            comment,
        } => {
            menus::submit_rating(&app, &menu_id, &item_id, stars, mood, &comment).await?;
            println!("Thanks for the feedback!");
        }
        Command::Like { item_id } => {
            if menus::toggle_like(&app, &item_id).await? {
                println!("Liked {item_id}.");
            } else {
                println!("Removed {item_id} from your likes.");
            }
        }
        Command::Notifications(NotificationCommand::List) => {
            for note in menus::notifications(&app).await? {
                println!(
                    "{} {} [{}] {}: {}",
                    if note.read { " " } else { "*" },
                    note.timestamp.format("%Y-%m-%d %H:%M"),
                    note.kind.as_str(),
                    note.title,
                    note.message
                );
                println!("  id {}", note.id);
            }
        }
        Command::Notifications(NotificationCommand::Read { id }) => {
            menus::mark_notification_read(&app, &id).await?;
        }
        Command::Notifications(NotificationCommand::Clear) => {
            menus::clear_notifications(&app).await?;
        }
        Command::Waste(WasteCommand::Log { containers, date }) => {
            let log = waste::log_waste(&app, containers, date).await?;
            println!(
                "Logged {} containers: {:.1} kg, {:.2} m³",
                log.container_count, log.total_weight_kg, log.total_volume_m3
            );
        }
        Command::Waste(WasteCommand::Config { volume, weight }) => {
            let current = waste::current_config(&app).await?;
            let config = if volume.is_none() && weight.is_none() {
                current
            } else {
                let updated = WasteConfig {
                    container_volume_m3: volume.unwrap_or(current.container_volume_m3),
                    container_weight_kg: weight.unwrap_or(current.container_weight_kg),
                };
                waste::update_waste_config(&app, updated).await?
            };
            println!(
                "One container = {} m³ / {} kg",
                config.container_volume_m3, config.container_weight_kg
            );
        }
        Command::Waste(WasteCommand::Report) => {
            let report = waste::monthly_report(&app).await?;
            if report.is_empty() {
                println!("No waste has been logged yet.");
                return Ok(());
            }
            for month in &report.months {
                println!(
                    "{:<16} {:>5} containers {:>9.1} kg {:>7.2} m³",
                    month.label, month.container_count, month.total_weight_kg, month.total_volume_m3
                );
            }
            println!("Total {:.1} kg", report.total_weight_kg);
        }
    }

    Ok(())
}
