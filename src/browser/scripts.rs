//! JavaScript evaluated inside rendered pages.

/// Stealth evasion JavaScript to inject into pages.
/// Based on puppeteer-extra-plugin-stealth techniques.
pub const STEALTH_SCRIPTS: &[&str] = &[
    // Remove webdriver property
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    // Fix chrome object
    r#"
    window.chrome = {
        runtime: {},
        loadTimes: function() {},
        csi: function() {},
        app: {}
    };
    "#,
    // Fix languages
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true
    });
    "#,
];

/// Resolves once the document is interactive.
pub const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// Build a script that clicks the first visible element matching `selector`
/// whose text contains one of `texts` (case-insensitive). Evaluates to
/// `true` when something was clicked.
pub fn click_by_text_script(selector: &str, texts: &[&str]) -> String {
    let selector = serde_json::Value::String(selector.to_string());
    let texts = serde_json::Value::Array(
        texts
            .iter()
            .map(|t| serde_json::Value::String(t.to_lowercase()))
            .collect(),
    );
    format!(
        r#"
    (() => {{
        const wanted = {texts};
        let nodes;
        try {{ nodes = Array.from(document.querySelectorAll({selector})); }} catch (e) {{ return false; }}
        for (const el of nodes) {{
            const text = (el.innerText || el.textContent || el.value || '').toLowerCase();
            if (wanted.length && !wanted.some((w) => text.includes(w))) continue;
            const rect = el.getBoundingClientRect();
            if (rect.width === 0 && rect.height === 0) continue;
            el.click();
            return true;
        }}
        return false;
    }})()
    "#
    )
}

/// Scroll down the page in small steps and hover a few links.
pub const HUMAN_SCROLL_SCRIPT: &str = r#"
    new Promise((resolve) => {
        let step = 0;
        const timer = setInterval(() => {
            window.scrollBy(0, 200 + Math.floor(Math.random() * 200));
            const links = document.querySelectorAll('a');
            if (links.length) {
                const target = links[Math.floor(Math.random() * links.length)];
                target.dispatchEvent(new MouseEvent('mouseover', { bubbles: true }));
            }
            step += 1;
            if (step >= 6) {
                clearInterval(timer);
                window.scrollTo(0, 0);
                resolve(step);
            }
        }, 250);
    })
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_script_escapes_arguments() {
        let script = click_by_text_script("a[title=\"x\"]", &["Show More"]);
        assert!(script.contains(r#"querySelectorAll("a[title=\"x\"]")"#));
        assert!(script.contains(r#"["show more"]"#));
    }
}
