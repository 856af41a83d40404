//! The accession upload form.
//!
//! Wires the page together: signals, file arena, dispatcher, transport and
//! the [`FormOrchestrator`]. Every DOM event is turned into an
//! [`UploadEvent`] and handed to the dispatcher.

use std::rc::Rc;

use leptos::*;
use web_sys::FileList;

use crate::components::{AccessionFields, AlertList, BotCheck, FilePreviews, TotalProgress};
use crate::config::UploadConfig;
use crate::events::{Dispatcher, UploadEvent};
use crate::orchestrator::FormOrchestrator;
use crate::services::{bot_check_value, files_from_list, FileArena, XhrTransport};
use crate::validation::{FormValues, Validator, BOT_CHECK_FIELD};
use crate::view::{FormSignals, PageView};

#[component]
pub fn UploadForm(config: Rc<UploadConfig>) -> impl IntoView {
    let signals = FormSignals::new();
    let arena = FileArena::new();
    let dispatcher = Dispatcher::new();
    let values = create_rw_signal(FormValues::new());

    let validator = Validator::accession_form(&config);
    let fields = store_value(validator.fields().to_vec());

    let page = PageView::new(signals, arena.clone());
    let transport = XhrTransport::new(arena.clone(), dispatcher.clone());
    let mut orchestrator = FormOrchestrator::new(config.clone(), validator, page, transport);
    dispatcher.bind(move |event| orchestrator.dispatch(event));

    let on_event = Callback::new(move |event: UploadEvent| dispatcher.dispatch(event));
    let arena = store_value(arena);

    let add_files = move |list: Option<FileList>| {
        let Some(list) = list else {
            return;
        };
        for file in files_from_list(&list) {
            let info = arena.with_value(|a| a.insert(file));
            log::debug!("Staging {} ({} bytes, {})", info.name, info.size, info.mime);
            on_event.call(UploadEvent::FileAdded(info));
        }
    };

    // Drag & drop
    let on_drag_enter = move |ev: ev::DragEvent| {
        ev.prevent_default();
        on_event.call(UploadEvent::DragHover(true));
    };
    let on_drag_over = move |ev: ev::DragEvent| {
        ev.prevent_default();
        on_event.call(UploadEvent::DragHover(true));
    };
    let on_drag_leave = move |_: ev::DragEvent| on_event.call(UploadEvent::DragHover(false));
    let on_drop = move |ev: ev::DragEvent| {
        ev.prevent_default();
        on_event.call(UploadEvent::DragHover(false));
        if signals.fields_enabled.get_untracked() {
            add_files(ev.data_transfer().and_then(|dt| dt.files()));
        }
    };

    // Click to browse
    let input_ref = create_node_ref::<html::Input>();
    let on_browse = move |_| {
        if !signals.fields_enabled.get_untracked() {
            return;
        }
        if let Some(input) = input_ref.get() {
            input.click();
        }
    };
    let on_picked = move |ev: ev::Event| {
        let input = event_target::<web_sys::HtmlInputElement>(&ev);
        add_files(input.files());
        input.set_value("");
    };

    let bot_check = config.requires_bot_check();
    let on_submit = move |ev: ev::MouseEvent| {
        ev.prevent_default();
        let mut snapshot = values.get_untracked();
        if bot_check {
            if let Some(token) = bot_check_value() {
                snapshot.insert(BOT_CHECK_FIELD.to_string(), token);
            }
        }
        on_event.call(UploadEvent::SubmitClicked(snapshot));
    };
    let on_form_reset = move |_: ev::Event| {
        values.set(FormValues::new());
        on_event.call(UploadEvent::Reset);
    };
    let on_remove_all = move |ev: ev::MouseEvent| {
        ev.prevent_default();
        on_event.call(UploadEvent::RemoveAllClicked);
    };

    let accept = config.accept.as_attribute();
    let thumbnail_width = config.thumbnail_width;
    let site_key = config.recaptcha_site_key.clone();
    let controls_disabled = move || !signals.controls_enabled.get();
    let form_container = signals.form_container;

    view! {
        <div
            id="formContainer"
            class="dropzone-form"
            class=("dropzone-form__drag-hover", move || signals.drag_hover.get())
            node_ref=form_container
            on:dragenter=on_drag_enter
            on:dragover=on_drag_over
            on:dragleave=on_drag_leave
            on:dragend=on_drag_leave
            on:drop=on_drop
        >
            <Show
                when=move || signals.success_html.with(Option::is_none)
                fallback=move || view! {
                    <div
                        class="dropzone-form__success"
                        inner_html=move || signals.success_html.get().unwrap_or_default()
                    ></div>
                }
            >
                <AlertList alerts=signals.alerts container=signals.error_container/>

                <form
                    id="dropzoneUpload"
                    novalidate=true
                    on:submit=|ev| ev.prevent_default()
                    on:reset=on_form_reset
                >
                    <fieldset disabled=move || !signals.fields_enabled.get()>
                        <legend>"About you"</legend>
                        <AccessionFields fields=fields values=values signals=signals on_event=on_event/>
                        {site_key
                            .clone()
                            .map(|key| view! { <BotCheck site_key=key required=signals.bot_check_required/> })}
                    </fieldset>

                    <div
                        id="dropzoneClickable"
                        class="dropzone-form__clickable"
                        class:disabled=move || !signals.fields_enabled.get()
                        on:click=on_browse
                    >
                        <i class="fa fa-cloud-upload fa-3x"></i>
                        <p>"Drop files here or click to browse."</p>
                    </div>
                    <input
                        type="file"
                        class="hidden"
                        multiple=true
                        accept=accept.clone()
                        node_ref=input_ref
                        on:change=on_picked
                    />

                    <FilePreviews
                        signals=signals
                        arena=arena
                        thumbnail_width=thumbnail_width
                        on_event=on_event
                    />

                    <TotalProgress progress=signals.progress/>

                    <div class="dropzone-form__actions">
                        <button
                            id="submitButton"
                            type="submit"
                            class="btn btn-primary"
                            disabled=controls_disabled
                            on:click=on_submit
                        >
                            "Submit"
                        </button>
                        <button
                            id="removeAllButton"
                            type="button"
                            class="btn btn-default"
                            disabled=controls_disabled
                            on:click=on_remove_all
                        >
                            "Remove all"
                        </button>
                    </div>
                </form>
            </Show>
        </div>
    }
}
