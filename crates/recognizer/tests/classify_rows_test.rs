use recognizer::classify::{UNRECOGNIZED_NAME, classify, dedup_records};
use recognizer::segment::segment;

#[test]
fn assigns_amount_profit_reference_by_magnitude() {
    let rows = segment("测试基金A10,000.00+500.00-2.00+1.23%");
    assert_eq!(rows.len(), 1);

    let record = classify(&rows[0]);
    assert_eq!(record.name, "测试基金A");
    assert_eq!(record.hold_amount, "10,000.00");
    assert_eq!(record.hold_profit, "500.00");
    assert!(!record.is_abnormal);
}

#[test]
fn negative_profit_keeps_its_sign() {
    let rows = segment("测试基金C8,000.00-300.00+5.00-0.80%");
    let record = classify(&rows[0]);
    assert_eq!(record.hold_amount, "8,000.00");
    assert_eq!(record.hold_profit, "-300.00");
    assert!(!record.is_abnormal);
}

#[test]
fn magnitude_tie_between_amount_and_profit_is_abnormal() {
    // +500.00 与 -500.00 量级相同，金额无法严格大于收益
    let rows = segment("测试基金A+500.00-500.00+2.00+1.23%");
    let record = classify(&rows[0]);
    assert!(record.is_abnormal);
    assert_eq!(record.hold_amount, "");
    assert_eq!(record.hold_profit, "");
}

#[test]
fn magnitude_tie_between_profit_and_reference_is_abnormal() {
    let rows = segment("测试基金A1,000.00+5.00-5.00+1.23%");
    let record = classify(&rows[0]);
    assert!(record.is_abnormal);
}

#[test]
fn fewer_than_three_tokens_is_abnormal_with_empty_fields() {
    // 两个数字块不足以区分金额/收益/昨日参考
    let rows = segment("易方达蓝筹精选混合A10,193.48+500.001.23%");
    assert_eq!(rows.len(), 1);

    let record = classify(&rows[0]);
    assert!(record.name.starts_with("易方达蓝筹精选混合"));
    assert!(record.is_abnormal);
    assert_eq!(record.hold_amount, "");
    assert_eq!(record.hold_profit, "");
}

#[test]
fn repeated_token_strings_are_deduplicated_before_counting() {
    // 同一数字块出现两次只算一个，剩 2 个去重后 token → 异常
    let rows = segment("测试基金A1,000.00+50.001,000.00+1.23%");
    let record = classify(&rows[0]);
    assert!(record.is_abnormal);
}

#[test]
fn unreadable_name_falls_back_to_sentinel() {
    let rows = segment("100.00+20.00+1.00+1.23%");
    let record = classify(&rows[0]);
    assert_eq!(record.name, UNRECOGNIZED_NAME);
    assert!(!record.is_abnormal);
}

#[test]
fn identical_records_collapse_to_one() {
    let text = "测试基金A10,000.00+500.00-2.00+1.23%测试基金A10,000.00+500.00-2.00+1.23%";
    let records: Vec<_> = segment(text).iter().map(classify).collect();
    assert_eq!(records.len(), 2);

    let deduped = dedup_records(records);
    assert_eq!(deduped.len(), 1);
    assert_eq!(deduped[0].name, "测试基金A");
}
