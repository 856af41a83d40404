//! Error banners shown after a rejected submission.

use leptos::*;

use crate::types::{Alert, AlertKind};

#[component]
pub fn AlertList(alerts: RwSignal<Vec<Alert>>, container: NodeRef<html::Div>) -> impl IntoView {
    view! {
        <div id="dropzoneFormError" node_ref=container>
            <For
                each=move || alerts.get().into_iter().enumerate()
                key=|(idx, alert)| (*idx, alert.text.clone())
                children=move |(idx, alert)| {
                    let kind = match alert.kind {
                        AlertKind::Field => "alert-field",
                        AlertKind::File => "alert-file",
                        AlertKind::General => "alert-general",
                    };
                    let dismiss = move |_| {
                        alerts.update(|list| {
                            if idx < list.len() {
                                list.remove(idx);
                            }
                        });
                    };
                    view! {
                        <div class=format!("alert alert-danger alert-dismissible {}", kind) role="alert">
                            <button type="button" class="close" aria-label="Close" on:click=dismiss>
                                <span aria-hidden="true">"×"</span>
                            </button>
                            <strong class="error">{alert.text}</strong>
                        </div>
                    }
                }
            />
        </div>
    }
}
