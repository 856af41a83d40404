//! Aggregate upload progress bar.

use leptos::*;

use crate::progress::ProgressReporter;

#[component]
pub fn TotalProgress(progress: RwSignal<ProgressReporter>) -> impl IntoView {
    let hidden = move || progress.with(|p| !p.is_visible());

    view! {
        <div
            id="totalProgressBar"
            class="dropzone-form__upload-progress"
            class=("dropzone-form__upload-progress--hidden", hidden)
        >
            <div class="progress">
                <div
                    id="total-progress"
                    class="progress-bar progress-bar-striped active"
                    role="progressbar"
                    style:width=move || progress.with(|p| p.width())
                >
                    {move || progress.with(|p| p.caption())}
                </div>
            </div>
        </div>
    }
}
