//! Text rendering for `keeper inspect`.

use keeper_babel::model::ConversionData;
use std::fmt::Write;

/// The resource tree, one line per resource, followed by table summaries.
pub fn render(data: &ConversionData) -> String {
    let mut out = String::new();
    for (depth, resource) in data.walk() {
        let _ = write!(
            out,
            "{}\u{2022} {}  [{}]",
            " ".repeat(depth * 4),
            resource.name,
            resource.id
        );
        let blocks: Vec<&str> = resource
            .content
            .blocks
            .iter()
            .map(|block| block.type_name())
            .collect();
        if !blocks.is_empty() {
            let _ = write!(out, "  {}", blocks.join(", "));
        }
        if !resource.attachments.is_empty() {
            let _ = write!(out, "  ({} attachments)", resource.attachments.len());
        }
        out.push('\n');
    }

    if !data.databases.is_empty() {
        out.push_str("\nTables:\n");
        for table in &data.databases {
            let _ = writeln!(
                out,
                "  {}: {} columns, {} rows (primary: {})",
                table.name,
                table.columns().len(),
                table.rows().len(),
                table.primary_column
            );
        }
    }

    let _ = writeln!(
        out,
        "\n{} resources, {} tables",
        data.len(),
        data.databases.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_babel::model::{DatabaseTable, Resource, WorkspaceBuilder};

    #[test]
    fn renders_nested_tree_and_tables() {
        let mut builder = WorkspaceBuilder::new();
        builder.add(Resource::new("r", "Realms"));
        builder.add(Resource::new("k", "Kaleah").with_parent(Some("r".into())));
        let mut table = DatabaseTable::new("Regions", "Name");
        table.push_row("Kaleah", [("Region", "North")]);
        builder.add_table(table);
        let data = builder.build().value;

        assert_eq!(
            render(&data),
            "\u{2022} Realms  [r]\n    \u{2022} Kaleah  [k]\n\nTables:\n  Regions: 2 columns, 1 rows (primary: Name)\n\n2 resources, 1 tables\n"
        );
    }
}
