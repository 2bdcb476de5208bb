use dioxus::prelude::*;
use marginalia_engine::content::Locale;

/// Locale toggle; each option shows its native-script name.
#[component]
pub fn LocaleSwitcher(current: Locale, on_switch: EventHandler<Locale>) -> Element {
    let options = Locale::ALL.map(|locale| (locale, locale.code(), locale.native_name()));

    rsx! {
        div {
            class: "locale-switcher",
            for (locale, code, name) in options {
                button {
                    key: "{code}",
                    class: if locale == current { "locale selected" } else { "locale" },
                    onclick: move |_| on_switch.call(locale),
                    "{name}"
                }
            }
        }
    }
}
