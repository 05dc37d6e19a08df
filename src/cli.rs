use anyhow::{bail, Context, Result};
use calendula_calendar::{
    weekday_labels, CalendarError, MonthCursor, Reminder, ReminderEditor, ReminderStore, WeekStart,
};
use calendula_core::theme::{EnvPreference, RootClassList};
use calendula_core::{App, Theme, ThemeStore};
use calendula_weather::{icon_url, label, Forecast, WeatherClient};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "calendula")]
#[command(about = "A month calendar with reminders and weather previews")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a month grid (defaults to the current month)
    Month {
        #[arg(short, long)]
        year: Option<i32>,
        /// Month number, 1-12
        #[arg(short, long)]
        month: Option<u32>,
        /// Months to move forward (negative moves back)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i32,
    },
    /// List reminders for a day (YYYY-MM-DD, defaults to today)
    Day { date: Option<String> },
    /// Create a reminder
    Add {
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long)]
        text: String,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        color: Option<String>,
        /// City to search; the best match becomes the reminder's location
        #[arg(short, long)]
        city: Option<String>,
    },
    /// Change an existing reminder
    Edit {
        id: String,
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long)]
        text: Option<String>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(short, long)]
        city: Option<String>,
    },
    /// Delete a reminder by id
    Remove { id: String },
    /// Delete every reminder on a day
    ClearDay { date: String },
    /// Delete every reminder
    ClearAll,
    /// Search cities by name
    Cities {
        query: String,
        #[arg(short, long, default_value_t = calendula_weather::geocode::DEFAULT_LIMIT)]
        limit: u32,
    },
    /// Forecast for a city on a day
    Forecast {
        city: String,
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Show or change the color theme
    Theme {
        #[arg(value_enum)]
        action: Option<ThemeAction>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ThemeAction {
    Toggle,
    Light,
    Dark,
}

/// Services wired for one invocation.
struct Session {
    app: App,
    reminders: ReminderStore,
    weather: WeatherClient,
    week_start: WeekStart,
}

impl Session {
    fn open() -> Result<Self> {
        let app = App::new()?;
        let mut reminders = ReminderStore::load(app.store().as_ref());
        reminders.persist_to(app.writer().clone());

        let weather = WeatherClient::new(app.api_key())
            .context("Failed to create weather client")?
            .with_base_url(&app.config().weather.api_base_url);
        let week_start = WeekStart::from_index(app.config().calendar.week_start).unwrap_or_default();

        Ok(Self {
            app,
            reminders,
            weather,
            week_start,
        })
    }
}

impl Cli {
    pub fn run() -> Result<()> {
        let cli = Self::parse();
        let session = Session::open()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start runtime")?;
        runtime.block_on(Self::dispatch(cli.command, session))
    }

    async fn dispatch(command: Option<Commands>, mut session: Session) -> Result<()> {
        let command = command.unwrap_or(Commands::Month {
            year: None,
            month: None,
            offset: 0,
        });

        match command {
            Commands::Month {
                year,
                month,
                offset,
            } => {
                let mut cursor = match (year, month) {
                    (None, None) => MonthCursor::today(),
                    (year, month) => {
                        let today = MonthCursor::today();
                        let month0 = match month {
                            Some(m @ 1..=12) => m as i32 - 1,
                            Some(m) => bail!("Month must be 1-12, got {}", m),
                            None => today.month0() as i32,
                        };
                        MonthCursor::new(year.unwrap_or(today.year()), month0)
                    }
                };
                for _ in 0..offset.unsigned_abs() {
                    if offset > 0 {
                        cursor.next_month();
                    } else {
                        cursor.prev_month();
                    }
                }
                print_month(&cursor, &session.reminders, session.week_start);
            }
            Commands::Day { date } => {
                let date_iso = resolve_date(date)?;
                let day = session.reminders.by_day(&date_iso);
                if day.is_empty() {
                    println!("No reminders on {}", date_iso);
                }
                for reminder in day {
                    print_reminder(reminder);
                }
            }
            Commands::Add {
                date,
                text,
                time,
                color,
                city,
            } => {
                let mut editor = ReminderEditor::create(resolve_date(date)?);
                editor.set_text(text);
                if let Some(time) = time {
                    editor.set_time(time);
                }
                if let Some(color) = color {
                    editor.set_color(color);
                }
                if let Some(city) = city {
                    choose_city(&mut editor, &session.weather, &city).await?;
                }
                save(&mut editor, &mut session).await?;
            }
            Commands::Edit {
                id,
                date,
                text,
                time,
                color,
                city,
            } => {
                let mut editor = ReminderEditor::edit(&session.reminders, &id)
                    .map_err(|e| anyhow::anyhow!(e.user_message()))?;
                if let Some(date) = date {
                    editor.set_date(date);
                }
                if let Some(text) = text {
                    editor.set_text(text);
                }
                if let Some(time) = time {
                    editor.set_time(time);
                }
                if let Some(color) = color {
                    editor.set_color(color);
                }
                if let Some(city) = city {
                    choose_city(&mut editor, &session.weather, &city).await?;
                }
                save(&mut editor, &mut session).await?;
            }
            Commands::Remove { id } => {
                if session.reminders.remove(&id) {
                    println!("Removed {}", id);
                } else {
                    println!("{}", CalendarError::ReminderNotFound(id).user_message());
                }
            }
            Commands::ClearDay { date } => {
                let removed = session.reminders.remove_by_date(&date);
                println!("Removed {} reminder(s) on {}", removed, date);
            }
            Commands::ClearAll => {
                let removed = session.reminders.remove_all();
                println!("Removed {} reminder(s)", removed);
            }
            Commands::Cities { query, limit } => {
                let geocoder = session.weather.geocoder();
                if !geocoder.has_credential() {
                    println!("City search needs an API key (set OWM_API_KEY).");
                }
                let cities = geocoder
                    .search_cities(&query, limit)
                    .await
                    .map_err(|e| anyhow::anyhow!(e.user_message()))?;
                for city in cities {
                    println!("{}  ({:.4}, {:.4})", label(&city), city.lat, city.lon);
                }
            }
            Commands::Forecast { city, date } => {
                let date_iso = resolve_date(date)?;
                let forecast = session
                    .weather
                    .get_forecast(city.as_str(), &date_iso)
                    .await
                    .map_err(|e| anyhow::anyhow!(e.user_message()))?;
                match forecast {
                    Some(forecast) => println!("{}: {}", date_iso, describe(&forecast)),
                    None => println!("No forecast available for {} on {}", city, date_iso),
                }
            }
            Commands::Theme { action } => {
                let mut theme = ThemeStore::boot(
                    session.app.writer().clone(),
                    &EnvPreference,
                    RootClassList::new(),
                );
                match action {
                    Some(ThemeAction::Toggle) => theme.toggle_theme(),
                    Some(ThemeAction::Light) => theme.set_theme(Theme::Light),
                    Some(ThemeAction::Dark) => theme.set_theme(Theme::Dark),
                    None => {}
                }
                println!("Theme: {}", theme.current());
            }
        }

        session.app.tick();
        session.app.shutdown()?;
        Ok(())
    }
}

/// Search `query` and attach the best match, or keep the text as a plain
/// city name when nothing matches.
async fn choose_city(editor: &mut ReminderEditor, weather: &WeatherClient, query: &str) -> Result<()> {
    let best = weather
        .geocoder()
        .search_cities(query, 1)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?
        .into_iter()
        .next();
    match best {
        Some(location) => editor.set_location(Some(location)),
        None => {
            editor.set_location(None);
            editor.set_city(query);
        }
    }
    Ok(())
}

async fn save(editor: &mut ReminderEditor, session: &mut Session) -> Result<()> {
    if editor.is_loading() {
        println!("Fetching forecast…");
        editor.load_forecast(&session.weather).await;
    }
    let saved = editor
        .submit(&mut session.reminders)
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    print_reminder(&saved);
    Ok(())
}

fn resolve_date(date: Option<String>) -> Result<String> {
    match date {
        Some(date) => {
            let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .with_context(|| format!("Invalid date: {}", date))?;
            Ok(parsed.format("%Y-%m-%d").to_string())
        }
        None => Ok(Local::now().date_naive().format("%Y-%m-%d").to_string()),
    }
}

fn describe(forecast: &Forecast) -> String {
    let icon = icon_url(forecast.icon.as_deref());
    if icon.is_empty() {
        forecast.summary.clone()
    } else {
        format!("{} ({})", forecast.summary, icon)
    }
}

fn print_reminder(reminder: &Reminder) {
    let mut line = format!(
        "{} {} {}  [{}]",
        reminder.date_iso, reminder.time, reminder.text, reminder.color
    );
    if !reminder.city.is_empty() {
        line.push_str(&format!("  @ {}", reminder.city));
    }
    if let Some(weather) = &reminder.weather {
        line.push_str(&format!("  Forecast: {}", describe(weather)));
    }
    println!("{}\n  id: {}", line, reminder.id);
}

fn print_month(cursor: &MonthCursor, reminders: &ReminderStore, week_start: WeekStart) {
    println!("{}", cursor.label());
    println!(
        "{}",
        weekday_labels(week_start)
            .iter()
            .map(|l| format!("{:>5}", l))
            .collect::<String>()
    );

    for week in cursor.grid(week_start).chunks(7) {
        let row: String = week
            .iter()
            .map(|day| {
                let number = day.iso.get(8..).unwrap_or("");
                let marker = if day.in_month && !reminders.by_day(&day.iso).is_empty() {
                    '*'
                } else {
                    ' '
                };
                if day.in_month {
                    format!("{:>4}{}", number, marker)
                } else {
                    format!("{:>4} ", ".")
                }
            })
            .collect();
        println!("{}", row);
    }

    let count = reminders
        .by_month(cursor.year(), cursor.month0() as i32)
        .len();
    println!("{} reminder(s) this month", count);
}
