//! Event handlers bound through `data-on*` attributes
//!
//! Handlers receive the runtime, the event and a snapshot of the state taken
//! when the event was dispatched. They change state only through
//! `set_state`.

use std::time::Duration;

use dom_dispatch::{patch, Deferred, DomEvent, Patch, Result, Runtime, TaskKey, Update};
use rand::Rng;

use crate::calculator;
use crate::github::{self, GithubClient};
use crate::notes::NoteStore;
use crate::state::AppState;

/// Characters the password generator draws from
pub const PASSWORD_CHARSET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()";

pub const PASSWORD_LENGTH: usize = 14;

/// Task key of the running countdown
pub const COUNTDOWN_TASK: &str = "countdown";

/// Shared services the handlers need
#[derive(Clone, Debug)]
pub struct Services {
    pub github: GithubClient,
    /// Note persistence; `None` keeps the note in memory only
    pub notes: Option<NoteStore>,
}

/// Register every handler under the name its markup binds
pub fn register(rt: &mut Runtime<AppState>, services: &Services) {
    rt.register_handler("incrementCounter", increment_counter)
        .register_handler("decrementCounter", decrement_counter)
        .register_handler("updateMirrorText", update_mirror_text)
        .register_handler("addItemToList", add_item_to_list)
        .register_handler("handleCalculatorInput", handle_calculator_input)
        .register_handler("handleColorChange", handle_color_change)
        .register_handler("handleTimerInput", handle_timer_input)
        .register_handler("toggleTimer", toggle_timer)
        .register_handler("handleCharCountInput", handle_char_count_input)
        .register_handler("handleCelsiusInput", handle_celsius_input)
        .register_handler("handleFahrenheitInput", handle_fahrenheit_input)
        .register_handler("rollDice", roll_dice)
        .register_handler("generatePassword", generate_password_handler)
        .register_handler("toggleAccordion", toggle_accordion);

    let client = services.github.clone();
    rt.register_handler("handleFetchGitHubUser", move |rt, event, state| {
        handle_fetch_github_user(rt, event, state, &client)
    });

    let notes = services.notes.clone();
    rt.register_handler("handleNoteInput", move |rt, event, state| {
        handle_note_input(rt, event, state, notes.as_ref())
    });

    rt.bind_input("updateMirrorText", "mirror_text");
}

fn increment_counter(rt: &mut Runtime<AppState>, _: &DomEvent, _: &AppState) -> Result<()> {
    rt.set_state(Update::with(|s: &AppState| {
        Patch::new().set("counter", s.counter + 1)
    }))
}

fn decrement_counter(rt: &mut Runtime<AppState>, _: &DomEvent, _: &AppState) -> Result<()> {
    rt.set_state(Update::with(|s: &AppState| {
        Patch::new().set("counter", s.counter - 1)
    }))
}

fn update_mirror_text(rt: &mut Runtime<AppState>, event: &DomEvent, _: &AppState) -> Result<()> {
    rt.set_state(Patch::new().set("mirror_text", event.value()))
}

fn add_item_to_list(rt: &mut Runtime<AppState>, _: &DomEvent, state: &AppState) -> Result<()> {
    let Some(input) = rt.element_by_id("newItemInput") else {
        return Ok(());
    };
    let text = rt.document().value(input).unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        tracing::debug!("No item text entered");
        return Ok(());
    }

    tracing::debug!(item = text, "Adding item");
    let mut items = state.items.clone();
    items.push(text.to_string());
    rt.set_state(Patch::new().set("items", items))?;

    // The list may have been re-rendered; clear whichever input is live now
    if let Some(input) = rt.element_by_id("newItemInput") {
        rt.document_mut().set_value(input, "");
    }
    Ok(())
}

fn handle_fetch_github_user(
    rt: &mut Runtime<AppState>,
    _: &DomEvent,
    _: &AppState,
    client: &GithubClient,
) -> Result<()> {
    let login = rt
        .element_by_id("githubUsernameInput")
        .and_then(|input| rt.document().value(input))
        .unwrap_or_default();
    let login = login.trim();
    if login.is_empty() {
        tracing::warn!("GitHub username input is empty");
        rt.tasks_mut().cancel(&TaskKey::from(github::FETCH_TASK));
        return rt.set_state(patch!({
            "github_user": null,
            "github_user_error": "Please enter a GitHub username.",
            "github_user_loading": false,
        }));
    }
    github::start_fetch(rt, client, login)
}

fn handle_calculator_input(
    rt: &mut Runtime<AppState>,
    event: &DomEvent,
    state: &AppState,
) -> Result<()> {
    match calculator::press(&state.calculator, event.value()) {
        Some(next) => rt.set_state(Patch::new().set("calculator", serde_json::to_value(next)?)),
        None => Ok(()),
    }
}

fn handle_color_change(rt: &mut Runtime<AppState>, event: &DomEvent, _: &AppState) -> Result<()> {
    rt.set_state(Patch::new().set("color_picker_value", event.value()))
}

/// Leading decimal digits of `text` as a number, 0 if there are none
fn leading_seconds(text: &str) -> u32 {
    let digits: String = text
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

fn handle_timer_input(rt: &mut Runtime<AppState>, event: &DomEvent, state: &AppState) -> Result<()> {
    if state.countdown.is_active {
        return Ok(());
    }
    let total = leading_seconds(event.value());
    rt.set_state(patch!({
        "countdown": { "total_seconds": total, "remaining": total }
    }))
}

fn toggle_timer(rt: &mut Runtime<AppState>, _: &DomEvent, state: &AppState) -> Result<()> {
    let countdown = state.countdown;
    if countdown.is_active {
        rt.tasks_mut().cancel(&TaskKey::from(COUNTDOWN_TASK));
        return rt.set_state(patch!({ "countdown": { "is_active": false } }));
    }

    let remaining = if countdown.remaining == 0 {
        countdown.total_seconds
    } else {
        countdown.remaining
    };
    rt.set_state(patch!({
        "countdown": { "remaining": remaining, "is_active": true }
    }))?;
    rt.tasks_mut()
        .interval(COUNTDOWN_TASK, Duration::from_secs(1), || {
            Box::new(countdown_tick) as Deferred<AppState>
        });
    Ok(())
}

/// One second of countdown; stops the timer when it reaches zero
pub fn countdown_tick(rt: &mut Runtime<AppState>) -> Result<()> {
    let countdown = rt.state().countdown;
    if !countdown.is_active {
        return Ok(());
    }
    let remaining = countdown.remaining.saturating_sub(1);
    if remaining == 0 {
        rt.tasks_mut().cancel(&TaskKey::from(COUNTDOWN_TASK));
        tracing::info!("Countdown finished");
        return rt.set_state(patch!({
            "countdown": { "remaining": 0, "is_active": false }
        }));
    }
    rt.set_state(patch!({ "countdown": { "remaining": remaining } }))
}

fn handle_char_count_input(
    rt: &mut Runtime<AppState>,
    event: &DomEvent,
    _: &AppState,
) -> Result<()> {
    rt.set_state(Patch::new().set("char_count_text", event.value()))
}

fn handle_note_input(
    rt: &mut Runtime<AppState>,
    event: &DomEvent,
    _: &AppState,
    notes: Option<&NoteStore>,
) -> Result<()> {
    let note = event.value();
    rt.set_state(Patch::new().set("note", note))?;
    if let Some(store) = notes {
        if let Err(e) = store.save(note) {
            tracing::warn!(path = %store.path().display(), error = %e, "Failed to save note");
        }
    }
    Ok(())
}

/// A finite number typed into a converter field
fn parse_temperature(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn handle_celsius_input(rt: &mut Runtime<AppState>, event: &DomEvent, _: &AppState) -> Result<()> {
    let celsius = event.value();
    let fahrenheit = parse_temperature(celsius)
        .map(|c| format!("{:.2}", c * 9.0 / 5.0 + 32.0))
        .unwrap_or_default();
    rt.set_state(patch!({
        "unit_converter": { "celsius": celsius, "fahrenheit": fahrenheit }
    }))
}

fn handle_fahrenheit_input(
    rt: &mut Runtime<AppState>,
    event: &DomEvent,
    _: &AppState,
) -> Result<()> {
    let fahrenheit = event.value();
    let celsius = parse_temperature(fahrenheit)
        .map(|f| format!("{:.2}", (f - 32.0) * 5.0 / 9.0))
        .unwrap_or_default();
    rt.set_state(patch!({
        "unit_converter": { "celsius": celsius, "fahrenheit": fahrenheit }
    }))
}

fn roll_dice(rt: &mut Runtime<AppState>, _: &DomEvent, _: &AppState) -> Result<()> {
    let roll: u8 = rand::thread_rng().gen_range(1..=6);
    rt.set_state(Patch::new().set("dice_result", format!("You rolled a {roll}")))
}

/// A random password of [`PASSWORD_LENGTH`] characters from [`PASSWORD_CHARSET`]
pub fn generate_password<R: Rng>(rng: &mut R) -> String {
    let charset = PASSWORD_CHARSET.as_bytes();
    (0..PASSWORD_LENGTH)
        .map(|_| char::from(charset[rng.gen_range(0..charset.len())]))
        .collect()
}

fn generate_password_handler(
    rt: &mut Runtime<AppState>,
    _: &DomEvent,
    _: &AppState,
) -> Result<()> {
    let password = generate_password(&mut rand::thread_rng());
    rt.set_state(Patch::new().set("generated_password", password))
}

fn toggle_accordion(rt: &mut Runtime<AppState>, _: &DomEvent, _: &AppState) -> Result<()> {
    rt.set_state(Update::with(|s: &AppState| {
        Patch::new().set("accordion_open", !s.accordion_open)
    }))
}
