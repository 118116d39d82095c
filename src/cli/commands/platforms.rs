//! Platforms command.

use console::style;

use crate::platforms::PlatformDispatcher;

/// Print the platform interaction table.
pub fn cmd_platforms() -> anyhow::Result<()> {
    let dispatcher = PlatformDispatcher::default();

    println!("{}", style("Platform profiles").bold());
    for profile in dispatcher.profiles() {
        let hosts = if profile.hosts.is_empty() {
            "(any other host)".to_string()
        } else {
            profile.hosts.join(", ")
        };
        println!();
        println!("  {} {}", style(profile.name).cyan().bold(), style(hosts).dim());
        println!("      settle: {}s", profile.settle.as_secs());
        println!("      link selectors: {}", profile.link_selectors.join(", "));
        if profile.max_expand_rounds > 0 {
            println!(
                "      expands: {} (up to {} rounds)",
                profile.expand_texts.join(" / "),
                profile.max_expand_rounds
            );
        }
        if let Some(warmup) = profile.warmup_url {
            println!("      warm-up: {}", warmup);
        }
        if profile.human_interaction {
            println!("      human-like scrolling");
        }
    }
    Ok(())
}
