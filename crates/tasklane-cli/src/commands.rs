use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use dialoguer::{Input, Password};

use tasklane_core::error::TasklaneError;
use tasklane_core::navigation::Navigator;
use tasklane_core::preferences::Theme;
use tasklane_core::routes::Route;
use tasklane_core::types::{
    ExportFormat, NewTask, Priority, ProfileUpdate, Task, TaskStatus, TaskUpdate,
};
use tasklane_core::views::{KanbanBoard, TaskFilter};
use tasklane_voice::{ChannelRecognizer, Clip, SpeechRecognizer, VoiceListener, VoiceState};

use crate::app::{App, Terminal};
use crate::{Commands, ConfigAction, ExportArg, KanbanAction, SidebarArg, TaskAction, ThemeArg};

pub async fn run(app: &App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Login { email } => login(app, email).await,
        Commands::Signup { name, email } => signup(app, name, email).await,
        Commands::Logout => {
            app.client.logout().await?;
            println!("Logged out.");
            Ok(())
        }
        Commands::Whoami => whoami(app).await,
        Commands::Profile { name, bio, picture } => {
            app.enter(Route::Profile)?;
            let update = ProfileUpdate {
                name,
                bio,
                profile_pic: picture,
            };
            let reply = app.client.update_profile(&update).await?;
            println!("{}", reply.message);
            Ok(())
        }
        Commands::ForgotPassword { email } => {
            let reply = app.client.forgot_password(&email).await?;
            println!("{}", reply.message);
            println!("Next: tasklane reset-password");
            Ok(())
        }
        Commands::ResetPassword { otp } => reset_password(app, otp).await,
        Commands::ChangePassword => change_password(app).await,
        Commands::Tasks { action } => tasks(app, action).await,
        Commands::Kanban { action } => kanban(app, action).await,
        Commands::Analytics => analytics(app).await,
        Commands::Activity { clear } => activity(app, clear).await,
        Commands::Summary => {
            app.enter(Route::AiSummary)?;
            println!("{}", app.client.ai_summary().await?);
            Ok(())
        }
        Commands::Bot { file } => {
            let clip = Clip::load(Path::new(&file))?;
            let reply = app
                .client
                .voice_bot(clip.wav, tasklane_voice::clip::UPLOAD_NAME)
                .await?;
            print_reply(app, &reply.reply, reply.route());
            Ok(())
        }
        Commands::Ask { text } => {
            let reply = app.client.voice_command(&text.join(" ")).await?;
            print_reply(app, &reply.reply, reply.route());
            Ok(())
        }
        Commands::Theme { mode } => {
            let theme = match mode {
                None => app.preferences.theme(),
                Some(ThemeArg::Toggle) => app.preferences.toggle_theme()?,
                Some(ThemeArg::Light) => set_theme(app, Theme::Light)?,
                Some(ThemeArg::Dark) => set_theme(app, Theme::Dark)?,
            };
            println!("Theme: {}", theme.as_str());
            Ok(())
        }
        Commands::Sidebar { state } => {
            if let Some(state) = state {
                app.preferences
                    .set_sidebar_collapsed(matches!(state, SidebarArg::Collapse))?;
            }
            let label = if app.preferences.sidebar_collapsed() {
                "collapsed"
            } else {
                "expanded"
            };
            println!("Sidebar: {label}");
            Ok(())
        }
        Commands::Voice => voice(app).await,
        Commands::Config { action } => config(app, action),
    }
}

fn set_theme(app: &App, theme: Theme) -> anyhow::Result<Theme> {
    app.preferences.set_theme(theme)?;
    Ok(theme)
}

fn prompt(label: &str) -> anyhow::Result<String> {
    Ok(Input::<String>::new()
        .with_prompt(label)
        .allow_empty(true)
        .interact_text()?)
}

fn secret(label: &str) -> anyhow::Result<String> {
    Ok(Password::new()
        .with_prompt(label)
        .allow_empty_password(true)
        .interact()?)
}

async fn login(app: &App, email: Option<String>) -> anyhow::Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt("Email")?,
    };
    let password = secret("Password")?;

    match app.client.login(&email, &password).await {
        Ok(user) => {
            println!("Welcome, {}!", user.name);
            Ok(())
        }
        Err(e @ TasklaneError::Api { .. }) => Err(TasklaneError::validation(
            e.user_message("Invalid email or password"),
        )
        .into()),
        Err(e) => Err(e.into()),
    }
}

async fn signup(app: &App, name: Option<String>, email: Option<String>) -> anyhow::Result<()> {
    let name = match name {
        Some(name) => name,
        None => prompt("Name")?,
    };
    let email = match email {
        Some(email) => email,
        None => prompt("Email")?,
    };
    let password = secret("Password")?;

    let reply = app.client.signup(&name, &email, &password).await?;
    println!("{}", reply.message);
    println!("Next: tasklane login --email {email}");
    Ok(())
}

async fn whoami(app: &App) -> anyhow::Result<()> {
    app.enter(Route::Profile)?;
    let profile = app.client.me().await?;
    println!("{} <{}>", profile.name, profile.email);
    if !profile.bio.is_empty() {
        println!("{}", profile.bio);
    }
    Ok(())
}

async fn reset_password(app: &App, otp: Option<String>) -> anyhow::Result<()> {
    let otp = match otp {
        Some(otp) => otp,
        None => prompt("OTP")?,
    };
    let new_password = secret("New password")?;
    let confirm = secret("Confirm password")?;

    let reply = app
        .client
        .reset_password(&otp, &new_password, &confirm)
        .await?;
    println!("{}", reply.message);
    Ok(())
}

async fn change_password(app: &App) -> anyhow::Result<()> {
    app.enter(Route::Settings)?;
    let current = secret("Current password")?;
    let new_password = secret("New password")?;
    let confirm = secret("Confirm new password")?;

    let reply = app
        .client
        .change_password(&current, &new_password, &confirm)
        .await?;
    println!("{}", reply.message);
    Ok(())
}

fn parse_priority(s: &str) -> anyhow::Result<Priority> {
    Priority::parse(s).with_context(|| format!("unknown priority '{s}' (High, Medium, Low)"))
}

fn parse_status(s: &str) -> anyhow::Result<TaskStatus> {
    TaskStatus::parse(&s.to_ascii_lowercase())
        .with_context(|| format!("unknown status '{s}' (todo, inprogress, completed, blocked)"))
}

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn print_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) {
    let mut any = false;
    for task in tasks {
        any = true;
        println!(
            "{:<26} {:<11} {:<7} {:<10} {}",
            task.id,
            task.status().map(|s| s.as_str()).unwrap_or("?"),
            task.priority.as_deref().unwrap_or("-"),
            task.date,
            task.title
        );
    }
    if !any {
        println!("No tasks found");
    }
}

async fn tasks(app: &App, action: TaskAction) -> anyhow::Result<()> {
    match action {
        TaskAction::List { search, date } => {
            app.enter(Route::Tasks)?;
            let tasks = app.client.list_tasks().await?;
            let filter = TaskFilter { search, date };
            print_tasks(filter.apply(&tasks));
        }
        TaskAction::Add {
            title,
            priority,
            date,
            description,
        } => {
            app.enter(Route::AddTask)?;
            let mut task = NewTask::new(title, parse_priority(&priority)?, parse_date(&date)?);
            task.description = description;
            let reply = app.client.create_task(&task).await?;
            println!("{}", reply.message);
            if let Some(id) = reply.task_id {
                println!("Task id: {id}");
            }
        }
        TaskAction::Show { id } => {
            app.enter(Route::TaskDetail(id.clone()))?;
            let task = app.client.get_task(&id).await?;
            println!("{}", task.title);
            println!("  status:   {}", task.status().map(|s| s.label()).unwrap_or("?"));
            println!("  priority: {}", task.priority.as_deref().unwrap_or("-"));
            println!("  due:      {}", task.date);
            if let Some(description) = task.description.filter(|d| !d.is_empty()) {
                println!("  {description}");
            }
            if let Some(name) = task.original_file_name.or(task.file_name) {
                println!("  attachment: {name}");
            }
        }
        TaskAction::Edit {
            id,
            title,
            description,
            priority,
            date,
        } => {
            app.enter(Route::EditTask(id.clone()))?;
            let update = TaskUpdate {
                title,
                description,
                priority: priority.as_deref().map(parse_priority).transpose()?,
                date: date
                    .as_deref()
                    .map(|d| parse_date(d).map(|d| d.format("%Y-%m-%d").to_string()))
                    .transpose()?,
                status: None,
            };
            let reply = app.client.update_task(&id, &update).await?;
            println!("{}", reply.message);
        }
        TaskAction::Delete { id } => {
            app.enter(Route::Tasks)?;
            let reply = app.client.delete_task(&id).await?;
            println!("{}", reply.message);
        }
        TaskAction::Status { id, status } => {
            app.enter(Route::Tasks)?;
            let reply = app.client.update_status(&id, parse_status(&status)?).await?;
            println!("{}", reply.message);
        }
        TaskAction::Overdue => {
            app.enter(Route::Dashboard)?;
            print_tasks(&app.client.overdue().await?);
        }
        TaskAction::Upcoming => {
            app.enter(Route::Dashboard)?;
            print_tasks(&app.client.upcoming().await?);
        }
        TaskAction::Export { format, output } => {
            app.enter(Route::Settings)?;
            let format = match format {
                ExportArg::Csv => ExportFormat::Csv,
                ExportArg::Pdf => ExportFormat::Pdf,
            };
            let output = output.unwrap_or_else(|| format!("tasks.{}", format.as_str()));
            let bytes = app.client.export(format).await?;
            std::fs::write(&output, &bytes).with_context(|| format!("writing {output}"))?;
            println!("Saved {} bytes to {output}", bytes.len());
        }
    }
    Ok(())
}

async fn kanban(app: &App, action: Option<KanbanAction>) -> anyhow::Result<()> {
    app.enter(Route::Kanban)?;
    let mut board = KanbanBoard::from_tasks(app.client.list_tasks().await?);

    if let Some(KanbanAction::Move {
        id,
        status,
        position,
    }) = action
    {
        let to = parse_status(&status)?;
        let Some((from, index)) = board.columns().iter().find_map(|column| {
            column
                .items
                .iter()
                .position(|t| t.id == id)
                .map(|i| (column.status, i))
        }) else {
            bail!("Task {id} is not on the board");
        };

        if let Some(change) = board.move_task(from, index, to, position) {
            app.client
                .update_status(&change.task_id, change.status)
                .await?;
        }
    }

    for column in board.columns() {
        println!("{} ({})", column.status.label(), column.items.len());
        for task in &column.items {
            println!("  - {} [{}]", task.title, task.id);
        }
    }
    Ok(())
}

async fn analytics(app: &App) -> anyhow::Result<()> {
    app.enter(Route::Analytics)?;
    let analytics = app.client.analytics().await?;

    println!("By status:");
    for s in &analytics.status_data {
        println!("  {:<12} {}", s.name, s.value);
    }
    println!("By priority:");
    for p in &analytics.priority_data {
        println!("  {:<12} {}", p.name, p.count);
    }
    println!("Weekly:");
    for w in &analytics.productivity_data {
        println!("  {:<12} {}", w.week, w.tasks);
    }
    Ok(())
}

async fn activity(app: &App, clear: bool) -> anyhow::Result<()> {
    app.enter(Route::Activity)?;
    if clear {
        app.client.clear_activity().await?;
        println!("Activity cleared");
        return Ok(());
    }

    let entries = app.client.activity().await?;
    if entries.is_empty() {
        println!("No activity yet");
    }
    for entry in entries {
        println!(
            "{}  {:<16} {} ({}, {})",
            entry.time, entry.action, entry.description, entry.device, entry.ip
        );
    }
    Ok(())
}

fn print_reply(app: &App, reply: &str, route: Option<Route>) {
    println!("{reply}");
    if let Some(route) = route {
        app.navigator.navigate(route.clone());
        println!("→ {}", app.navigator.current().path());
    }
}

async fn voice(app: &App) -> anyhow::Result<()> {
    let voice = app.config.voice();
    let recognizer: Option<Arc<dyn SpeechRecognizer>> = if voice.enabled {
        Some(Arc::new(ChannelRecognizer::stdin()?))
    } else {
        None
    };
    let navigator = Arc::new(Terminal::new(app.session.clone(), false));
    let mut listener = VoiceListener::new(recognizer, navigator);

    let mut state = listener.subscribe();
    if !listener.activate()? {
        println!("Voice navigation is disabled (voice.enabled = false)");
        return Ok(());
    }
    tracing::debug!(language = %voice.language, "Voice input from stdin");
    println!(
        "{}. Say \"automatic\" to navigate by voice, Ctrl-D to stop.",
        listener.state().mode_label()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                println!("[{}]", current.mode_label());
                if current == VoiceState::Idle {
                    break;
                }
            }
        }
    }

    listener.shutdown().await;
    Ok(())
}

fn config(app: &App, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("# {}", app.config_path.display());
            println!("{}", serde_json::to_string_pretty(&app.config)?);
        }
        ConfigAction::Get { key } => match app.config.get_path(&key) {
            Some(value) => println!("{value}"),
            None => bail!("No config value at '{key}'"),
        },
        ConfigAction::Set { key, value } => {
            // Accept JSON literals; anything else is stored as a string
            let value = serde_json::from_str(&value).unwrap_or(serde_json::Value::String(value));
            let mut config = app.config.clone();
            config.set_path(&key, value)?;
            let (_, errors) = config.validate();
            if let Some(first) = errors.first() {
                bail!("{first}");
            }
            config.save(&app.config_path)?;
            println!("Set {key}");
        }
        ConfigAction::Validate => {
            let (warnings, errors) = app.config.validate();
            for w in &warnings {
                println!("warning: {w}");
            }
            for e in &errors {
                println!("error: {e}");
            }
            if !errors.is_empty() {
                bail!("{} config error(s)", errors.len());
            }
            println!("Config OK");
        }
    }
    Ok(())
}
