use crate::config::{DEFAULT_NAME_ALIASES, DEFAULT_SUBJECTS};
use crate::models::Record;
use crate::table::Table;

// 语文, 数学, 英语, 物理, 化学
const SAMPLE_ROWS: [(&str, [f64; 5]); 20] = [
    ("张三", [85.0, 92.0, 78.0, 88.0, 83.0]),
    ("李四", [79.0, 85.0, 91.0, 76.0, 89.0]),
    ("王五", [92.0, 78.0, 85.0, 93.0, 87.0]),
    ("赵六", [88.0, 94.0, 82.0, 85.0, 91.0]),
    ("钱七", [76.0, 81.0, 88.0, 79.0, 84.0]),
    ("孙八", [94.0, 87.0, 93.0, 91.0, 88.0]),
    ("周九", [82.0, 89.0, 76.0, 84.0, 86.0]),
    ("吴十", [87.0, 83.0, 89.0, 87.0, 82.0]),
    ("陈一", [95.0, 98.0, 92.0, 96.0, 94.0]),
    ("郑二", [90.0, 91.0, 97.0, 90.0, 93.0]),
    ("冯三", [75.0, 72.0, 78.0, 70.0, 74.0]),
    ("褚四", [68.0, 75.0, 70.0, 72.0, 69.0]),
    ("卫五", [80.0, 65.0, 73.0, 78.0, 77.0]),
    ("蒋六", [55.0, 62.0, 58.0, 50.0, 59.0]),
    ("沈七", [48.0, 55.0, 40.0, 52.0, 45.0]),
    ("韩八", [63.0, 50.0, 59.0, 48.0, 53.0]),
    ("杨九", [98.0, 60.0, 95.0, 55.0, 58.0]),
    ("朱十", [65.0, 99.0, 62.0, 97.0, 90.0]),
    ("秦十一", [70.0, 71.0, 68.0, 67.0, 72.0]),
    ("尤十二", [66.0, 69.0, 72.0, 65.0, 68.0]),
];

/// A twenty-student class over the default subjects, for demos.
pub fn sample_table() -> Table {
    let subjects: Vec<String> = DEFAULT_SUBJECTS.iter().map(|s| s.to_string()).collect();
    let records = SAMPLE_ROWS
        .iter()
        .map(|(name, scores)| {
            subjects
                .iter()
                .zip(scores)
                .fold(Record::new(*name), |record, (subject, &score)| {
                    record.with_score(subject.clone(), score)
                })
        })
        .collect();
    Table::from_parts(DEFAULT_NAME_ALIASES[0].to_string(), subjects, records)
}
