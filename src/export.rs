use crate::ranking;
use crate::table::Table;

pub const BOM: &str = "\u{FEFF}";
pub const COMPUTED_HEADERS: [&str; 3] = ["total", "average", "rank"];

const TEMPLATE_NAMES: [&str; 6] = ["张三", "李四", "王五", "赵六", "钱七", "孙八"];

fn format_score(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> csv::Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(format!("{BOM}{}", String::from_utf8_lossy(&bytes)))
}

/// Writes the table in ranking order with total, average and rank appended.
pub fn to_csv(table: &Table) -> csv::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![table.name_header().to_string()];
    header.extend(table.subjects().iter().cloned());
    header.extend(COMPUTED_HEADERS.iter().map(|h| h.to_string()));
    writer.write_record(&header)?;

    for entry in ranking::rank(table) {
        let mut row = vec![entry.name.clone()];
        row.extend(entry.grades.iter().map(|grade| format_score(grade.score)));
        row.push(format_score(entry.total));
        row.push(format!("{:.1}", entry.average));
        row.push(entry.rank.to_string());
        writer.write_record(&row)?;
    }

    finish(writer)
}

/// Blank-ready upload template: the header for `subjects` and a few sample rows.
pub fn template_csv(name_header: &str, subjects: &[String]) -> csv::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![name_header.to_string()];
    header.extend(subjects.iter().cloned());
    writer.write_record(&header)?;

    for (row_index, name) in TEMPLATE_NAMES.iter().enumerate() {
        let mut row = vec![name.to_string()];
        row.extend(
            (0..subjects.len()).map(|col| (60 + (row_index * 7 + col * 13) % 40).to_string()),
        );
        writer.write_record(&row)?;
    }

    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{parse_csv, IngestOptions};
    use crate::models::Record;

    fn table() -> Table {
        let mut table = Table::new("name", vec!["Math".to_string(), "Eng".to_string()]).unwrap();
        table
            .add_student(Record::new("B").with_score("Math", 70.0).with_score("Eng", 95.5))
            .unwrap();
        table
            .add_student(Record::new("Lee, A").with_score("Math", 90.0).with_score("Eng", 80.0))
            .unwrap();
        table
    }

    #[test]
    fn export_appends_computed_columns_in_rank_order() {
        let csv = to_csv(&table()).unwrap();
        assert!(csv.starts_with(BOM));
        let lines: Vec<&str> = csv.trim_start_matches(BOM).lines().collect();
        assert_eq!(lines[0], "name,Math,Eng,total,average,rank");
        assert_eq!(lines[1], "\"Lee, A\",90,80,170,85.0,1");
        assert_eq!(lines[2], "B,70,95.5,165.5,82.8,2");
    }

    #[test]
    fn exported_csv_reingests_to_same_scores() {
        let original = table();
        let csv = to_csv(&original).unwrap();
        let ingestion = parse_csv(&csv, &IngestOptions::default()).unwrap();
        let reloaded = ingestion.table;
        assert_eq!(reloaded.subjects(), original.subjects());
        for record in original.records() {
            let twin = reloaded
                .records()
                .iter()
                .find(|r| r.name == record.name)
                .unwrap();
            assert_eq!(twin.scores, record.scores);
        }
    }

    #[test]
    fn template_rows_stay_in_range() {
        let subjects = vec!["语文".to_string(), "数学".to_string(), "英语".to_string()];
        let csv = template_csv("姓名", &subjects).unwrap();
        let ingestion = parse_csv(&csv, &IngestOptions::default()).unwrap();
        assert_eq!(ingestion.table.len(), 6);
        assert!(ingestion.skipped.is_empty());
        for record in ingestion.table.records() {
            assert!(record.scores.values().all(|&s| (60.0..100.0).contains(&s)));
        }
    }
}
