//! Staged file previews: thumbnail or icon, error marker, description
//! and remove button.

use leptos::*;

use crate::events::UploadEvent;
use crate::services::FileArena;
use crate::types::{Preview, StagedFile};
use crate::view::FormSignals;

#[component]
pub fn FilePreviews(
    signals: FormSignals,
    arena: StoredValue<FileArena>,
    thumbnail_width: u32,
    on_event: Callback<UploadEvent>,
) -> impl IntoView {
    view! {
        <div id="dropzonePreviews" class="dropzone-previews">
            <For
                each=move || signals.files.get()
                key=|file| (file.handle, file.status.clone())
                children=move |file| {
                    view! {
                        <FilePreview
                            file=file
                            arena=arena
                            thumbnail_width=thumbnail_width
                            fields_enabled=signals.fields_enabled
                            on_event=on_event
                        />
                    }
                }
            />
        </div>
    }
}

#[component]
fn FilePreview(
    file: StagedFile,
    arena: StoredValue<FileArena>,
    thumbnail_width: u32,
    fields_enabled: RwSignal<bool>,
    on_event: Callback<UploadEvent>,
) -> impl IntoView {
    let handle = file.handle;
    let error = file.status.error_message();
    let errored = error.is_some();
    let size = file.display_size();

    let thumb = match &file.preview {
        Preview::Thumbnail => {
            let src = arena.with_value(|a| a.preview_url(handle)).unwrap_or_default();
            view! { <img src=src alt=file.name.clone() width=thumbnail_width/> }.into_view()
        }
        Preview::Icon(icon) => view! { <i class=format!("fa fa-{} fa-5x", icon)></i> }.into_view(),
    };

    let on_description = move |ev: ev::Event| {
        on_event.call(UploadEvent::DescriptionEdited {
            handle,
            text: event_target_value(&ev),
        });
    };
    let on_remove = move |_| on_event.call(UploadEvent::FileRemoved(handle));

    view! {
        <div class="dropzone-template" class:dz-error=errored>
            <div class="dropzone-template__thumb">{thumb}</div>
            <div class="dropzone-template__details">
                <span class="dropzone-template__name">{file.name}</span>
                <span class="dropzone-template__size">{size}</span>
            </div>
            <div class="error" style:display=if errored { "block" } else { "none" }>
                <span>{error.unwrap_or_default()}</span>
            </div>
            <textarea
                name="file-file_description"
                class="form-control"
                placeholder="File description"
                rows="5"
                prop:value=file.description
                disabled=move || !fields_enabled.get()
                on:input=on_description
            ></textarea>
            <button
                type="button"
                class="btn btn-default dropzone-template__remove-button"
                class:hidden=move || !fields_enabled.get()
                on:click=on_remove
            >
                "Remove file"
            </button>
        </div>
    }
}
