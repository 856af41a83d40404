//! Footer component

use leptos::*;

#[component]
pub fn Footer() -> impl IntoView {
    view! {
        <footer>
            <div>"University Libraries • Digital Collections"</div>
            <div class="footer-links">
                <a href="https://library.unt.edu/archives/" class="footer-link" target="_blank">
                    "Special Collections"
                </a>
                <a href="https://library.unt.edu/ask-us/" class="footer-link" target="_blank">
                    "Ask Us"
                </a>
            </div>
        </footer>
    }
}
