use std::{
    io::{stdout, Stdout, Write},
    num::NonZeroU64,
    sync::PoisonError,
    time::Duration,
};

use colored::Colorize;
use copypasta::{ClipboardContext, ClipboardProvider};
use crossterm::{
    cursor,
    event::{self, poll, KeyCode, KeyEvent, KeyModifiers},
    terminal, ExecutableCommand,
};
use inquire::{validator::Validation, InquireError};
use rpassword::read_password;
use zeroize::Zeroize;

use twofa::{
    scheduler::{BlockingProvider, DisplayState, RefreshScheduler, SchedulerHandle},
    Account, AccountStore, AppError, AppResult, SharedStore, PLACEHOLDER_CODE,
};

use crate::parser::{AddArgs, EditArgs, ShowArgs, TargetArgs};

// 'q' quits, so it is not a label
const LABELS: &[u8] = b"123456789abcdefghijklmnoprstuvwxyz";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn read_secret_from_stdin(prompt: &str) -> AppResult<String> {
    print!("{}", prompt);
    stdout().flush()?;

    let mut unsecured = read_password()?;
    let secret = unsecured.trim().to_string();
    unsecured.zeroize();

    Ok(secret)
}

fn required(input: &str) -> Result<Validation, inquire::CustomUserError> {
    if input.trim().is_empty() {
        Ok(Validation::Invalid("This field is required.".into()))
    } else {
        Ok(Validation::Valid)
    }
}

/// Asks a yes/no question; cancelling the prompt counts as no.
fn confirm(prompt: &str) -> AppResult<bool> {
    match inquire::Confirm::new(prompt).with_default(false).prompt() {
        Ok(answer) => Ok(answer),
        Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Resolves an index or an issuer name to an index into `store`.
pub fn resolve_target(store: &AccountStore, target: &str) -> AppResult<usize> {
    if let Ok(index) = target.parse::<usize>() {
        if index < store.len() {
            return Ok(index);
        }

        return Err(AppError::GenericError(format!(
            "There is no account #{}; there are {} accounts.",
            index,
            store.len()
        )));
    }

    if let Some(index) = store.find_by_issuer(target) {
        return Ok(index);
    }

    let mut message = format!("Could not find an account issued by {}.", target.yellow());
    if let Some(issuer) = store.closest_issuer(target) {
        message.push_str(format!(" Did you mean {}?", issuer.yellow()).as_str());
    }

    Err(AppError::GenericError(message))
}

pub fn format_account(account: &Account, index: usize) -> String {
    let mut acc = String::new();

    acc.push_str(
        format!(
            "{} {}",
            format!("#{}", index).truecolor(130, 130, 130),
            account.title().yellow().bold()
        )
        .as_str(),
    );
    acc.push('\n');
    acc.push_str(account.subtitle().as_str());

    if account.digits.get() != 6 || account.period.get() != 30 {
        acc.push('\n');
        acc.push_str(
            format!("{} digits every {}s", account.digits, account.period)
                .truecolor(130, 130, 130)
                .to_string()
                .as_str(),
        );
    }

    acc
}

fn format_code(state: &DisplayState) -> String {
    let mut code = state.code.clone();
    if state.is_copyable() {
        code.insert(code.len() / 2, ' ');
    }

    match state.remaining {
        Some(remaining) => format!(
            "{}{}",
            code.green(),
            format!(" · {}", remaining).bright_white()
        ),
        None => code.truecolor(130, 130, 130).to_string(),
    }
}

/// The live view: every account with its key, and the code of the selected one.
pub fn render_view(
    accounts: &[Account],
    selected: Option<usize>,
    state: &DisplayState,
    status: Option<&str>,
) -> String {
    let mut view = String::new();

    for (idx, account) in accounts.iter().enumerate() {
        let label = LABELS.get(idx).map(|l| *l as char).unwrap_or(' ');
        let mut lines = format!(
            "{} {}\n{}",
            format!("[{}]", account.initial()).truecolor(130, 130, 130),
            account.title().yellow().bold(),
            account.subtitle()
        );

        if selected == Some(idx) {
            lines.push('\n');
            if state.selected == Some(idx) {
                lines.push_str(format_code(state).as_str());
            } else {
                lines.push_str(format_code(&DisplayState::cleared(state.seq)).as_str());
            }
            let block = textwrap::indent(lines.as_str(), "│    ");
            view.push_str(format!("{}:", label).as_str());
            view.push_str(block.trim_end_matches('\n'));
        } else {
            let block = textwrap::indent(lines.as_str(), "     ");
            view.push_str(format!("  {}:", label).as_str());
            view.push_str(block.trim_end_matches('\n').get(4..).unwrap_or_default());
        }
        view.push('\n');
    }

    if selected.is_none() {
        view.push_str(format!("  {}\n\n", PLACEHOLDER_CODE).truecolor(130, 130, 130).to_string().as_str());
    }

    if let Some(status) = status {
        view.push_str(status);
        view.push('\n');
    }

    view.push_str(
        "[key] select · backspace deselect · space copy · q quit"
            .truecolor(130, 130, 130)
            .to_string()
            .as_str(),
    );

    view
}

fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Selects `target` if given, else the first account when nothing is selected yet.
pub fn resolve_start_selection(store: &mut AccountStore, target: Option<&str>) -> AppResult<()> {
    match target {
        Some(target) => {
            let index = resolve_target(store, target)?;
            store.select(Some(index))?;
        }
        None if !store.is_empty() && store.selected_index().is_none() => {
            store.select(Some(0))?;
        }
        None => (),
    }

    Ok(())
}

fn copy_to_clipboard(code: &str) -> AppResult<()> {
    let mut ctx =
        ClipboardContext::new().map_err(|err| AppError::ClipboardError(err.to_string()))?;
    ctx.set_contents(code.to_string())
        .map_err(|err| AppError::ClipboardError(err.to_string()))
}

fn stream_codes(stdout: &mut Stdout, store: &SharedStore, handle: &SchedulerHandle) -> AppResult<()> {
    let mut display = handle.subscribe();
    let mut state = display.borrow_and_update().clone();
    let mut status: Option<String> = None;
    let mut line_count = 0u16;
    let mut refresh = true;

    loop {
        if display.has_changed().unwrap_or(false) {
            state = display.borrow_and_update().clone();
            refresh = true;
        }

        if refresh {
            refresh = false;

            if line_count > 0 {
                stdout.execute(cursor::MoveUp(line_count))?;
            }
            stdout.execute(cursor::MoveToColumn(0))?;
            stdout.execute(terminal::Clear(terminal::ClearType::FromCursorDown))?;

            let view = {
                let store = store.read().unwrap_or_else(PoisonError::into_inner);
                render_view(
                    store.accounts(),
                    store.selected_index(),
                    &state,
                    status.as_deref(),
                )
            };

            write!(stdout, "{}", view.replace('\n', "\r\n"))?;
            stdout.flush()?;
            line_count = view.lines().count().saturating_sub(1) as u16;
        }

        if poll(POLL_INTERVAL)? {
            let event::Event::Key(key) = event::read()? else {
                continue;
            };

            if is_quit(&key) {
                break;
            }

            match key.code {
                KeyCode::Char(' ') => {
                    if state.is_copyable() {
                        status = Some(match copy_to_clipboard(&state.code) {
                            Ok(()) => "Copied!".green().to_string(),
                            Err(err) => err.to_string().red().to_string(),
                        });
                        refresh = true;
                    }
                }
                KeyCode::Backspace => {
                    let mut store = store.write().unwrap_or_else(PoisonError::into_inner);
                    store.select(None)?;
                    handle.refresh_now();
                    status = None;
                    refresh = true;
                }
                KeyCode::Char(c) => {
                    let Some(index) = LABELS.iter().position(|l| *l as char == c) else {
                        continue;
                    };

                    let mut store = store.write().unwrap_or_else(PoisonError::into_inner);
                    if index < store.len() {
                        store.select(Some(index))?;
                        handle.refresh_now();
                        status = None;
                        refresh = true;
                    }
                }
                _ => (),
            }
        }
    }

    writeln!(stdout, "\r")?;
    Ok(())
}

pub fn add_subcommand(args: AddArgs, store: &mut AccountStore) -> AppResult<()> {
    let issuer = match args.issuer {
        Some(issuer) => issuer,
        None => inquire::Text::new("Issuer:")
            .with_validator(required)
            .prompt()?,
    };

    let secret = read_secret_from_stdin("Secret: ")?;
    let period = NonZeroU64::new(args.period)
        .ok_or(AppError::GenericError("Period must be at least one second.".to_string()))?;

    let account = Account::new(issuer, args.account.unwrap_or_default(), secret)
        .with_digits(args.digits.unwrap_or_default())
        .with_period(period);

    if !account.is_usable() {
        println!(
            "{}",
            "The secret does not decode to any key bytes; its code will show ERR.".yellow()
        );
    }

    let index = store.add(account)?;
    let title = store.get(index).map(|a| a.title().to_string()).unwrap_or_default();
    println!("{}", format!("Added {} as #{}.", title, index).green());

    Ok(())
}

pub fn edit_subcommand(args: EditArgs, store: &mut AccountStore) -> AppResult<()> {
    let index = resolve_target(store, &args.target)?;
    let current = store.get(index).cloned().ok_or(AppError::GenericError(format!(
        "There is no account #{}.",
        index
    )))?;

    let issuer = match args.issuer {
        Some(issuer) => issuer,
        None => inquire::Text::new("Issuer:")
            .with_default(&current.issuer)
            .with_validator(required)
            .prompt()?,
    };

    let label = match args.account {
        Some(label) => label,
        None => inquire::Text::new("Account:")
            .with_default(&current.account)
            .prompt()?,
    };

    let mut secret = read_secret_from_stdin("Secret (leave empty to keep the current one): ")?;
    if secret.is_empty() {
        secret = current.secret.clone();
    }

    let updated = Account::new(issuer, label, secret)
        .with_digits(args.digits.unwrap_or(current.digits))
        .with_period(args.period.and_then(NonZeroU64::new).unwrap_or(current.period));

    store.edit(index, updated)?;
    println!("{}", format!("Updated #{}.", index).green());

    Ok(())
}

pub fn delete_subcommand(args: TargetArgs, store: &mut AccountStore) -> AppResult<()> {
    let index = resolve_target(store, &args.target)?;
    let title = store
        .get(index)
        .map(|a| a.title().to_string())
        .unwrap_or_default();

    if !confirm(format!("Are you sure you want to delete {}?", title.yellow()).as_str())? {
        println!("Aborting...");
        return Ok(());
    }

    store.remove(index)?;
    println!("{}", format!("Deleted {}.", title).green());

    Ok(())
}

pub fn clear_subcommand(store: &mut AccountStore) -> AppResult<()> {
    if store.is_empty() {
        println!("{}", "No accounts to delete.".truecolor(150, 150, 150));
        return Ok(());
    }

    let prompt = format!("Are you sure you want to delete all {} accounts?", store.len());
    if !confirm(&prompt)? {
        println!("Aborting...");
        return Ok(());
    }

    store.clear()?;
    println!("{}", "Deleted all accounts.".green());

    Ok(())
}

pub fn list_subcommand(store: &AccountStore) -> AppResult<()> {
    if store.is_empty() {
        println!("{}", "No accounts to show.".truecolor(150, 150, 150));
        return Ok(());
    }

    for (index, account) in store.accounts().iter().enumerate() {
        let entry = format_account(account, index);
        let mut lines = entry.lines();
        if let Some(first) = lines.next() {
            println!("{}", first);
        }
        let rest: Vec<&str> = lines.collect();
        println!("{}", textwrap::indent(rest.join("\n").as_str(), "   "));
    }

    Ok(())
}

pub fn uri_subcommand(args: TargetArgs, store: &AccountStore) -> AppResult<()> {
    let index = resolve_target(store, &args.target)?;
    if let Some(account) = store.get(index) {
        println!("{}", account.enrollment_uri());
    }

    Ok(())
}

pub fn show_subcommand(args: ShowArgs, store: SharedStore) -> AppResult<()> {
    {
        let mut store = store.write().unwrap_or_else(PoisonError::into_inner);
        if store.is_empty() {
            println!("{}", "No accounts to show.".truecolor(150, 150, 150));
            return Ok(());
        }

        resolve_start_selection(&mut store, args.target.as_deref())?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()?;

    let handle = {
        let _guard = runtime.enter();
        RefreshScheduler::new(store.clone())
            .with_provider(BlockingProvider)
            .spawn()
    };

    let mut stdout = stdout();
    stdout.execute(cursor::Hide)?;
    terminal::enable_raw_mode()?;

    let res = stream_codes(&mut stdout, &store, &handle);

    stdout.execute(cursor::Show)?;
    terminal::disable_raw_mode()?;
    runtime.block_on(handle.shutdown());

    res
}
