//! This file defines the header shown at the top of pages for logged in users.

use maud::{Markup, html};

use crate::{endpoints, html::BUTTON_SECONDARY_STYLE};

/// The header with the greeting, dark mode toggle and log-out link.
pub struct NavBar<'a> {
    email: &'a str,
    is_dark: bool,
}

impl<'a> NavBar<'a> {
    /// Get the header for the user with `email`.
    ///
    /// `is_dark` decides the label on the dark mode toggle.
    pub fn new(email: &'a str, is_dark: bool) -> Self {
        Self { email, is_dark }
    }

    pub fn into_html(self) -> Markup {
        let toggle_label = if self.is_dark {
            "Light mode"
        } else {
            "Dark mode"
        };

        // Template adapted from https://flowbite.com/docs/components/navbar/#default-navbar
        html!(
            nav class="bg-white border-gray-200 dark:bg-gray-900"
            {
                div
                    class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    span
                        id="greeting"
                        class="self-center text-xl font-semibold whitespace-nowrap dark:text-white"
                    {
                        "Welcome, " (self.email)
                    }

                    div class="flex items-center gap-4"
                    {
                        button
                            id="dark-mode-toggle"
                            type="button"
                            hx-post=(endpoints::DARK_MODE_API)
                            class=(BUTTON_SECONDARY_STYLE)
                        {
                            (toggle_label)
                        }

                        a
                            href=(endpoints::LOG_OUT)
                            class="block py-2 px-3 text-gray-900 rounded-sm hover:text-blue-700
                                dark:text-white dark:hover:text-blue-500"
                        {
                            "Log out"
                        }
                    }
                }
            }
        )
    }
}
