use crate::configuration::ImageSettings;

/// Checks image urls without fetching them.
#[derive(Debug, Clone)]
pub struct ImageValidator {
    placeholder_patterns: Vec<String>,
    cdn_host: String,
    cdn_path_marker: String,
    extensions: Vec<String>,
}

impl ImageValidator {
    pub fn new(settings: &ImageSettings) -> Self {
        ImageValidator {
            placeholder_patterns: settings
                .placeholder_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            cdn_host: settings.cdn_host.clone(),
            cdn_path_marker: settings.cdn_path_marker.clone(),
            extensions: settings
                .extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    pub fn is_valid(&self, image_url: &str) -> bool {
        if image_url.trim().is_empty() {
            return false;
        }

        let url_lower = image_url.to_lowercase();
        if self
            .placeholder_patterns
            .iter()
            .any(|pattern| url_lower.contains(pattern.as_str()))
        {
            return false;
        }

        if image_url.contains(&self.cdn_host) && image_url.contains(&self.cdn_path_marker) {
            return true;
        }

        self.extensions
            .iter()
            .any(|ext| url_lower.contains(ext.as_str()))
    }
}

impl Default for ImageValidator {
    fn default() -> Self {
        Self::new(&ImageSettings::default())
    }
}
