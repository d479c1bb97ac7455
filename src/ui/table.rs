use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &crate::storage::StoreStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Table", &stats.table);
    builder.add_row("Nodes", &stats.nodes.to_string());
    builder.add_row("Embedding dim", &stats.embed_dim.to_string());
    match stats.lexemes {
        Some(lexemes) => {
            builder.add_row("Lexemes", &lexemes.to_string());
            builder.add_row("Text search", stats.text_search_config.as_str());
        }
        None => builder.add_row("Lexemes", "hybrid search disabled"),
    }
    builder.build()
}
