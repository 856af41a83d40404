//! Donor contact fields with per-field validation feedback.

use leptos::*;

use crate::events::UploadEvent;
use crate::validation::{FieldFeedback, FieldSpec, FormValues, AFFILIATION_CHOICES};
use crate::view::FormSignals;

/// How a field is rendered, derived from its name.
#[derive(Clone, Copy, PartialEq)]
enum Control {
    Text,
    Email,
    Tel,
    TextArea,
    Select,
}

impl Control {
    fn for_field(name: &str) -> Self {
        if name.ends_with("affiliation") {
            Control::Select
        } else if name.ends_with("description") {
            Control::TextArea
        } else if name.ends_with("email_address") {
            Control::Email
        } else if name.ends_with("phone_number") {
            Control::Tel
        } else {
            Control::Text
        }
    }
}

#[component]
pub fn AccessionFields(
    fields: StoredValue<Vec<FieldSpec>>,
    values: RwSignal<FormValues>,
    signals: FormSignals,
    on_event: Callback<UploadEvent>,
) -> impl IntoView {
    let rows: Vec<FieldSpec> = fields.with_value(|fields| {
        fields.iter().filter(|f| !f.id.is_bot_check()).cloned().collect()
    });

    rows.into_iter()
        .map(|spec| view! { <FieldGroup spec=spec values=values signals=signals on_event=on_event/> })
        .collect_view()
}

#[component]
fn FieldGroup(
    spec: FieldSpec,
    values: RwSignal<FormValues>,
    signals: FormSignals,
    on_event: Callback<UploadEvent>,
) -> impl IntoView {
    let name = spec.id.name().to_string();
    let dom_id = format!("id_{}", name);
    let required = spec.is_required();
    let id = spec.id.clone();
    let feedback = create_memo(move |_| signals.feedback_for(&id));

    let failing = move || matches!(feedback.get(), FieldFeedback::Failing(_));
    let passing = move || feedback.get() == FieldFeedback::Passing;
    let messages = move || match feedback.get() {
        FieldFeedback::Failing(messages) => messages,
        _ => Vec::new(),
    };

    let field = name.clone();
    let on_input = move |ev: ev::Event| {
        let value = event_target_value(&ev);
        values.update(|v| {
            v.insert(field.clone(), value);
        });
        on_event.call(UploadEvent::FieldEdited {
            field: field.clone(),
            values: values.get_untracked(),
        });
    };

    let control = match Control::for_field(&name) {
        Control::Select => view! {
            <select id=dom_id.clone() name=name.clone() class="form-control" on:change=on_input>
                <option value="">"---------"</option>
                {AFFILIATION_CHOICES
                    .iter()
                    .map(|(code, label)| view! { <option value=*code>{*label}</option> })
                    .collect_view()}
            </select>
        }
        .into_view(),
        Control::TextArea => view! {
            <textarea id=dom_id.clone() name=name.clone() class="form-control" rows="5" on:input=on_input></textarea>
        }
        .into_view(),
        kind => {
            let input_type = match kind {
                Control::Email => "email",
                Control::Tel => "tel",
                _ => "text",
            };
            view! {
                <input
                    id=dom_id.clone()
                    name=name.clone()
                    type=input_type
                    class="form-control"
                    on:input=on_input
                />
            }
            .into_view()
        }
    };

    view! {
        <div class="form-group has-feedback" class:has-error=failing class:has-success=passing>
            <label for=dom_id class="control-label">
                {spec.label}
                {required.then(|| view! { <span class="required">" *"</span> })}
            </label>
            {control}
            <span
                class="form-control-feedback fa"
                data-toggle="tooltip"
                class:fa-times=failing
                class:fa-check=passing
                title=move || messages().join(" ")
            ></span>
            <Show when=failing>
                <ul class="field-errors">
                    {move || messages().into_iter().map(|m| view! { <li>{m}</li> }).collect_view()}
                </ul>
            </Show>
        </div>
    }
}

/// reCAPTCHA slot. The widget script fills in the response field itself;
/// this only shows the "required" notice when validation asks for it.
#[component]
pub fn BotCheck(site_key: String, required: RwSignal<bool>) -> impl IntoView {
    view! {
        <div class="form-group">
            <div class="g-recaptcha" data-sitekey=site_key></div>
            <div
                id="grecaptcha-required"
                class="text-danger"
                style:display=move || if required.get() { "" } else { "none" }
            >
                "Please complete the verification."
            </div>
        </div>
    }
}
