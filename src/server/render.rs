//! Authorization page rendering

use crate::authorization::dispatcher::InteractionPage;

/// Produces the HTML of the authorization page.
pub trait InteractionRenderer: Send + Sync {
    /// Renders `page`; the form posts to `decision_url`.
    fn render(&self, page: &InteractionPage, decision_url: &str) -> String;
}

/// Built-in plain HTML page.
///
/// Shows the client, the requested scopes, a login form when no user is
/// cached, and the approve/deny buttons. The approve button is the only
/// control named `authorized`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl InteractionRenderer for HtmlRenderer {
    fn render(&self, page: &InteractionPage, decision_url: &str) -> String {
        let context = &page.context;
        let mut html = String::with_capacity(2048);

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str("<title>Authorization</title>\n</head>\n<body>\n");
        html.push_str(&format!(
            "<h1>{}</h1>\n",
            escape_html(context.client_display_name())
        ));
        html.push_str("<p>This application is requesting the following permissions.</p>\n");

        if !context.scopes.is_empty() {
            html.push_str("<dl id=\"scopes\">\n");
            for scope in &context.scopes {
                html.push_str(&format!("<dt>{}</dt>\n", escape_html(&scope.name)));
                if let Some(description) = &scope.description {
                    html.push_str(&format!("<dd>{}</dd>\n", escape_html(description)));
                }
            }
            html.push_str("</dl>\n");
        }

        html.push_str(&format!(
            "<form method=\"post\" action=\"{}\">\n",
            escape_html(decision_url)
        ));

        match &page.identity {
            Some(identity) => {
                let shown = identity.login_id.as_deref().unwrap_or(&identity.subject);
                html.push_str(&format!(
                    "<p id=\"user\">Logged in as <b>{}</b>.</p>\n",
                    escape_html(shown)
                ));
            }
            None => {
                if page.login_error {
                    html.push_str(
                        "<p id=\"login-error\">Login ID or password is incorrect.</p>\n",
                    );
                }
                html.push_str("<div id=\"login\">\n");
                html.push_str(
                    "<input type=\"text\" name=\"loginId\" placeholder=\"Login ID\" autocomplete=\"off\" required>\n",
                );
                html.push_str(
                    "<input type=\"password\" name=\"password\" placeholder=\"Password\" required>\n",
                );
                html.push_str("</div>\n");
            }
        }

        html.push_str("<input type=\"submit\" name=\"authorized\" value=\"Authorize\">\n");
        html.push_str("<input type=\"submit\" name=\"denied\" value=\"Deny\" formnovalidate>\n");
        html.push_str("</form>\n</body>\n</html>\n");
        html
    }
}

/// Escapes text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
