use super::*;

#[test]
fn counts_are_grouped_and_sorted_by_category() {
    let doc_types = vec![
        "skills".to_string(),
        "experience".to_string(),
        "skills".to_string(),
        "education".to_string(),
        "skills".to_string(),
    ];

    let counts = category_counts(&doc_types);

    assert_eq!(
        counts,
        vec![
            ("education".to_string(), 1),
            ("experience".to_string(), 1),
            ("skills".to_string(), 3),
        ]
    );
}

#[test]
fn no_records_means_no_counts() {
    assert!(category_counts(&[]).is_empty());
}
