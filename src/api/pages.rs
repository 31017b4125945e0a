//! HTML for the authentication surfaces.

const STYLE: &str = r#"<style>
body { font-family: sans-serif; background: #1f2933; color: #f5f7fa; display: flex; justify-content: center; }
main { margin-top: 12vh; width: 22rem; text-align: center; }
input, button { width: 100%; padding: .6rem; margin: .3rem 0; box-sizing: border-box; }
button { cursor: pointer; }
.error { color: #ff8a80; min-height: 1.2rem; }
footer { margin-top: 2rem; font-size: .75rem; opacity: .6; }
</style>"#;

const LOGIN_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Sign in</title>{{STYLE}}</head>
<body>
<main>
  <h2>Sign in</h2>
  <form id="login">
    <input id="username" autocomplete="username" placeholder="Username" required>
    <input id="password" type="password" autocomplete="current-password" placeholder="Password" required>
    <button type="submit">Sign in</button>
  </form>
  <p class="error" id="error"></p>
  <footer>{{VERSION}}</footer>
</main>
<script>
const encoder = new TextEncoder();
const toHex = (bytes) => Array.from(bytes, (b) => b.toString(16).padStart(2, "0")).join("");
const hexText = (text) => toHex(encoder.encode(text));
async function sha512(text) {
  const digest = await crypto.subtle.digest("SHA-512", encoder.encode(text));
  return toHex(new Uint8Array(digest));
}
document.getElementById("login").addEventListener("submit", async (event) => {
  event.preventDefault();
  const username = document.getElementById("username").value;
  const password = document.getElementById("password").value;
  const timestamp = Math.floor(Date.now() / 1000).toString();
  const signature = await sha512(hexText(username) + hexText(password) + timestamp);
  const token = btoa(hexText(username + "," + signature + "," + timestamp));
  const response = await fetch("{{VERIFY}}", {
    method: "POST",
    credentials: "same-origin",
    headers: { "Authorization": "Bearer " + token },
  });
  if (response.ok) {
    const body = await response.json();
    window.location.href = body.redirect_url;
    return;
  }
  let message = response.statusText;
  try {
    const body = await response.json();
    message = body.details ? body.error + ". " + body.details : body.error;
  } catch (_) {}
  document.getElementById("error").textContent = message;
});
</script>
</body>
</html>"#;

const NOTICE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{{TITLE}}</title>{{STYLE}}</head>
<body>
<main>
  <h2>{{TITLE}}</h2>
  <p>{{MESSAGE}}</p>
  {{ACTIONS}}
  <footer>{{VERSION}}</footer>
</main>
</body>
</html>"#;

fn version() -> String {
    format!("v{}", env!("CARGO_PKG_VERSION"))
}

/// Escape text for inclusion in HTML.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn link_button(href: &str, label: &str) -> String {
    format!(
        r#"<p><a href="{}"><button type="button">{}</button></a></p>"#,
        escape_html(href),
        escape_html(label)
    )
}

fn notice(title: &str, message: &str, actions: &str) -> String {
    NOTICE_HTML
        .replace("{{STYLE}}", STYLE)
        .replace("{{TITLE}}", &escape_html(title))
        .replace("{{MESSAGE}}", &escape_html(message))
        .replace("{{ACTIONS}}", actions)
        .replace("{{VERSION}}", &version())
}

/// Login form posting a signed credential to `verify_path`.
pub fn login(verify_path: &str) -> String {
    LOGIN_HTML
        .replace("{{STYLE}}", STYLE)
        .replace("{{VERIFY}}", &escape_html(verify_path))
        .replace("{{VERSION}}", &version())
}

/// Session expired or invalid.
pub fn session(reason: &str, sign_in: &str, fallback_path: &str, fallback_button: &str) -> String {
    let actions = format!(
        "{}{}",
        link_button(sign_in, "SIGN IN"),
        link_button(fallback_path, fallback_button)
    );
    notice("Session", reason, &actions)
}

/// Access denied after repeated failures.
pub fn unauthorized(sign_in: &str, fallback_path: &str, fallback_button: &str) -> String {
    let actions = format!(
        "{}{}",
        link_button(sign_in, "TRY AGAIN"),
        link_button(fallback_path, fallback_button)
    );
    notice(
        "Unauthorized",
        "Too many failed login attempts. Access denied.",
        &actions,
    )
}

/// Confirmation after logout.
pub fn logout(sign_in: &str) -> String {
    notice(
        "Logged out",
        "You have been successfully logged out.",
        &link_button(sign_in, "SIGN IN"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_session_page_escapes_reason() {
        let html = session("<b>gone</b>", "/login", "/", "HOME");
        assert!(html.contains("&lt;b&gt;gone&lt;/b&gt;"));
        assert!(html.contains(r#"href="/login""#));
        assert!(html.contains("HOME"));
    }

    #[test]
    fn test_login_page_posts_to_verify() {
        let html = login("/verify-login");
        assert!(html.contains(r#"fetch("/verify-login""#));
        assert!(!html.contains("{{"));
    }
}
