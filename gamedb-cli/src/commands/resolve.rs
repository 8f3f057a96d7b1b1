use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gamedb_catalog::{RecordFragment, prepare_title};
use gamedb_resolver::Settings;

use crate::CliError;

/// Resolve a raw title and print the identity and its provider metadata.
pub(crate) fn run_resolve(settings: &Settings, name: &str) -> Result<(), CliError> {
    let rt = super::runtime()?;

    let (resolution, fragment) = rt.block_on(async {
        let chain = super::build_chain(settings).await?;
        let resolution = chain
            .resolve(name)
            .await
            .map_err(|e| CliError::resolve(e.to_string()))?;
        let fragment = chain
            .fetch_detail(resolution.provider, resolution.external_id)
            .await
            .map_err(|e| CliError::resolve(e.to_string()))?;
        Ok::<_, CliError>((resolution, fragment))
    })?;

    log::info!(
        "{} {}",
        "Title:".if_supports_color(Stdout, |t| t.bold()),
        name,
    );
    log::info!("  Search term:  {}", prepare_title(name));
    log::info!(
        "  Match:        {} {}",
        resolution.provider.if_supports_color(Stdout, |t| t.cyan()),
        resolution.external_id,
    );
    print_fragment(&fragment);

    Ok(())
}

fn print_fragment(fragment: &RecordFragment) {
    log::info!(
        "  Name:         {}",
        fragment.name.if_supports_color(Stdout, |t| t.green()),
    );
    if let Some(cover) = &fragment.cover {
        log::info!("  Cover:        {}", cover);
    }
    print_list("Developers", &fragment.developers);
    print_list("Publishers", &fragment.publishers);
    print_list("Languages", &fragment.languages);
    print_list("Aliases", &fragment.aliases);
    if !fragment.screenshots.is_empty() {
        log::info!("  Screenshots:  {}", fragment.screenshots.len());
    }
    if let Some(description) = &fragment.description {
        crate::log_blank();
        log::info!("  {}", super::truncate_str(description, 300));
    }
}

fn print_list(label: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    log::info!("  {:<13} {}", format!("{}:", label), values.join(", "));
}
