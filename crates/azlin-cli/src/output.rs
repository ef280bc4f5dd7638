use serde::Serialize;
use tabled::Tabled;

/// `--output`/`-o` selection; defaults to `table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn from_str_arg(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            _ => Self::Table,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(OutputFormat::from_str_arg(s))
    }
}

pub fn render_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("(none)");
            } else {
                let table = tabled::Table::new(items)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{table}");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
    }
}

pub fn render_one<T: Serialize + Tabled>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let table = tabled::Table::new(std::iter::once(item))
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(item).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(item).unwrap_or_default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_arg_is_case_insensitive_and_defaults_to_table() {
        assert_eq!(OutputFormat::from_str_arg("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_arg("yml"), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_str_arg("whatever"), OutputFormat::Table);
    }

    #[derive(Serialize, Tabled)]
    struct Row {
        name: String,
        count: u32,
    }

    #[test]
    fn render_list_handles_empty_table() {
        let items: Vec<Row> = vec![];
        render_list(&items, OutputFormat::Table);
    }

    #[test]
    fn render_list_json_and_yaml_do_not_panic() {
        let items = vec![Row { name: "a".into(), count: 1 }];
        render_list(&items, OutputFormat::Json);
        render_list(&items, OutputFormat::Yaml);
    }
}
