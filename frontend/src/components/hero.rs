//! Hero section component

use leptos::*;

#[component]
pub fn Hero() -> impl IntoView {
    view! {
        <div class="hero">
            <h1>"Submit Materials to the University Archives"</h1>
            <p class="subtitle">
                "Tell us who you are, add the files you would like to donate, and describe each one. "
                "Files are transferred together once the form is complete."
            </p>
        </div>
    }
}
