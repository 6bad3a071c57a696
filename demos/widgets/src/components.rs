//! Widget components
//!
//! Each widget is a pure render function; `#[component]` infers the state
//! fields it reads. Text coming from state is escaped before it is spliced
//! into markup.

use dom_dispatch::{component, escape_attribute, escape_html, Result, Runtime};

use crate::calculator;
use crate::state::{AppState, Countdown, GithubUser, UnitConverter};

#[component]
pub fn counter_widget(state: &AppState) -> String {
    format!(
        r#"<div class="widget">
    <h3>Counter</h3>
    <p>Current count: <strong>{}</strong></p>
    <button data-onclick="incrementCounter">Increment</button>
    <button data-onclick="decrementCounter">Decrement</button>
</div>"#,
        state.counter
    )
}

#[component(name = "InputMirrorWidget")]
pub fn mirror_widget(state: &AppState) -> String {
    format!(
        r#"<div class="widget">
    <h3>Input Mirror</h3>
    <input type="text" id="mirrorInput" placeholder="Type here..." value="{}" data-oninput="updateMirrorText">
    <p>Mirrored text:</p>
    <pre id="mirrorOutput">{}</pre>
</div>"#,
        escape_attribute(&state.mirror_text),
        escape_html(&state.mirror_text)
    )
}

#[component]
pub fn list_widget(state: &AppState) -> String {
    let rows: String = if state.items.is_empty() {
        "<li>No items yet.</li>".to_string()
    } else {
        state
            .items
            .iter()
            .map(|item| format!("<li>{}</li>", escape_html(item)))
            .collect()
    };
    format!(
        r#"<div class="widget">
    <h3>Dynamic List</h3>
    <input type="text" id="newItemInput" placeholder="New item...">
    <button data-onclick="addItemToList">Add Item</button>
    <ul>{rows}</ul>
</div>"#
    )
}

fn user_card(user: &GithubUser) -> String {
    let or_na = |value: &Option<String>| {
        escape_html(value.as_deref().unwrap_or("N/A")).into_owned()
    };
    format!(
        r#"<div class="github-user">
    <img src="{avatar}" alt="Avatar for {login}" width="60" height="60">
    <div>
        <strong>{name}</strong> ({login})<br>
        Bio: {bio}<br>
        Location: {location}<br>
        Company: {company}<br>
        Followers: {followers}
    </div>
</div>"#,
        avatar = escape_attribute(&user.avatar_url),
        login = escape_html(&user.login),
        name = escape_html(user.name.as_deref().unwrap_or(&user.login)),
        bio = or_na(&user.bio),
        location = or_na(&user.location),
        company = or_na(&user.company),
        followers = user.followers,
    )
}

#[component(name = "GitHubUserWidget")]
pub fn github_user_widget(state: &AppState) -> String {
    let AppState {
        github_query,
        github_user,
        github_user_loading,
        github_user_error,
        ..
    } = state;

    let showing = if *github_user_loading {
        if github_query.is_empty() {
            "...".to_string()
        } else {
            escape_html(github_query).into_owned()
        }
    } else {
        github_user
            .as_ref()
            .map(|user| escape_html(&user.login).into_owned())
            .unwrap_or_else(|| "N/A".to_string())
    };

    let content = if *github_user_loading {
        "<p>Loading GitHub user data...</p>".to_string()
    } else if let Some(error) = github_user_error {
        format!(r#"<p class="error">Error: {}</p>"#, escape_html(error))
    } else if let Some(user) = github_user {
        user_card(user)
    } else {
        "<p>Click the button to load user data.</p>".to_string()
    };

    let (disabled, label) = if *github_user_loading {
        (" disabled", "Fetching...")
    } else {
        ("", "Fetch User")
    };

    format!(
        r#"<div class="widget">
    <h3>GitHub User Info</h3>
    <div>
        <input type="text" id="githubUsernameInput" placeholder="Enter GitHub username..." value="{query}">
        <button data-onclick="handleFetchGitHubUser"{disabled}>{label}</button>
    </div>
    <hr>
    <h4>Showing data for: {showing}</h4>
    {content}
</div>"#,
        query = escape_attribute(github_query),
    )
}

#[component]
pub fn calculator_widget(state: &AppState) -> String {
    let buttons: String = calculator::KEYS
        .iter()
        .map(|key| {
            format!(
                r#"<button data-onclick="handleCalculatorInput" value="{}">{}</button>"#,
                escape_attribute(key),
                escape_html(key)
            )
        })
        .collect();
    format!(
        r#"<div class="widget">
    <h3>Calculator</h3>
    <input type="text" id="calculatorDisplay" value="{}" readonly>
    <div>{buttons}</div>
</div>"#,
        escape_attribute(&state.calculator.display)
    )
}

#[component]
pub fn color_picker_widget(state: &AppState) -> String {
    let color = escape_attribute(&state.color_picker_value);
    format!(
        r#"<div class="widget">
    <h3>Color Picker</h3>
    <input type="color" id="colorInput" value="{color}" data-oninput="handleColorChange">
    <span>Selected: {color}</span>
    <div class="swatch" style="background-color: {color};"></div>
</div>"#
    )
}

#[component]
pub fn countdown_timer_widget(state: &AppState) -> String {
    let countdown: &Countdown = &state.countdown;
    let disabled = if countdown.is_active { " disabled" } else { "" };
    let toggle = if countdown.is_active { "Pause" } else { "Start" };
    format!(
        r#"<div class="widget">
    <h3>Countdown Timer</h3>
    <div>
        <label>Set seconds: </label>
        <input type="number" id="timerInput" value="{total}" data-oninput="handleTimerInput" min="1"{disabled}>
    </div>
    <div class="clock">{clock}</div>
    <button data-onclick="toggleTimer">{toggle}</button>
</div>"#,
        total = countdown.total_seconds,
        clock = countdown.clock(),
    )
}

#[component]
pub fn char_counter_widget(state: &AppState) -> String {
    let text = &state.char_count_text;
    format!(
        r#"<div class="widget">
    <h3>Character Counter</h3>
    <textarea id="charCountInput" data-oninput="handleCharCountInput" placeholder="Type something...">{}</textarea>
    <p>Character Count: {}</p>
</div>"#,
        escape_html(text),
        text.chars().count()
    )
}

#[component]
pub fn note_widget(state: &AppState) -> String {
    format!(
        r#"<div class="widget">
    <h3>Persistent Note</h3>
    <textarea id="noteInput" data-oninput="handleNoteInput">{}</textarea>
    <p><small>This note is saved to disk on every edit.</small></p>
</div>"#,
        escape_html(&state.note)
    )
}

#[component]
pub fn unit_converter_widget(state: &AppState) -> String {
    let UnitConverter {
        celsius,
        fahrenheit,
    } = &state.unit_converter;
    format!(
        r#"<div class="widget">
    <h3>Celsius &lt;-&gt; Fahrenheit</h3>
    <input type="number" id="celsiusInput" value="{}" data-oninput="handleCelsiusInput" placeholder="Celsius">
    <span> = </span>
    <input type="number" id="fahrenheitInput" value="{}" data-oninput="handleFahrenheitInput" placeholder="Fahrenheit">
</div>"#,
        escape_attribute(celsius),
        escape_attribute(fahrenheit)
    )
}

#[component]
pub fn dice_roller_widget(state: &AppState) -> String {
    format!(
        r#"<div class="widget">
    <h3>Dice Roller (1d6)</h3>
    <p>Result: <strong>{}</strong></p>
    <button data-onclick="rollDice">Roll</button>
</div>"#,
        escape_html(&state.dice_result)
    )
}

#[component]
pub fn password_generator_widget(state: &AppState) -> String {
    format!(
        r#"<div class="widget">
    <h3>Password Generator</h3>
    <pre id="passwordOutput">{}</pre>
    <button data-onclick="generatePassword">Generate New</button>
</div>"#,
        escape_html(&state.generated_password)
    )
}

#[component]
pub fn accordion_widget(state: &AppState) -> String {
    let (arrow, display) = if state.accordion_open {
        ("▲", "block")
    } else {
        ("▼", "none")
    };
    format!(
        r#"<div class="widget">
    <h3 class="accordion-title" data-onclick="toggleAccordion">
        <span>Collapsible Section</span>
        <span>{arrow}</span>
    </h3>
    <div id="accordionBody" style="display: {display};">
        This is the content of the accordion. It can be shown or hidden by clicking the title.
    </div>
</div>"#
    )
}

/// Register every widget, in board order
pub fn register_all(rt: &mut Runtime<AppState>) -> Result<()> {
    rt.register_component(CounterWidget)?;
    rt.register_component(MirrorWidget)?;
    rt.register_component(ListWidget)?;
    rt.register_component(GithubUserWidget)?;
    rt.register_component(CalculatorWidget)?;
    rt.register_component(ColorPickerWidget)?;
    rt.register_component(CountdownTimerWidget)?;
    rt.register_component(CharCounterWidget)?;
    rt.register_component(NoteWidget)?;
    rt.register_component(UnitConverterWidget)?;
    rt.register_component(DiceRollerWidget)?;
    rt.register_component(PasswordGeneratorWidget)?;
    rt.register_component(AccordionWidget)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inferred_dependencies() {
        assert_eq!(CounterWidget::DEPENDENCIES, &["counter"]);
        assert_eq!(MirrorWidget::DEPENDENCIES, &["mirror_text"]);
        assert_eq!(ListWidget::DEPENDENCIES, &["items"]);
        assert_eq!(
            GithubUserWidget::DEPENDENCIES,
            &[
                "github_query",
                "github_user",
                "github_user_error",
                "github_user_loading"
            ]
        );
        assert_eq!(CalculatorWidget::DEPENDENCIES, &["calculator"]);
        assert_eq!(CountdownTimerWidget::DEPENDENCIES, &["countdown"]);
        assert_eq!(UnitConverterWidget::DEPENDENCIES, &["unit_converter"]);
        assert_eq!(AccordionWidget::DEPENDENCIES, &["accordion_open"]);
    }

    #[test]
    fn test_markup_is_escaped() {
        let state = AppState {
            mirror_text: "<b>\"hi\"</b>".to_string(),
            ..AppState::default()
        };
        let html = mirror_widget(&state);
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_empty_list_placeholder() {
        let state = AppState {
            items: Vec::new(),
            ..AppState::default()
        };
        assert!(list_widget(&state).contains("<li>No items yet.</li>"));
    }

    #[test]
    fn test_github_loading_shows_query() {
        let state = AppState {
            github_query: "octocat".to_string(),
            github_user_loading: true,
            ..AppState::default()
        };
        let html = github_user_widget(&state);
        assert!(html.contains("Showing data for: octocat"));
        assert!(html.contains("disabled"));
        assert!(html.contains("Loading GitHub user data..."));
    }
}
