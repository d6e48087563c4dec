use procwatch::core::profiler::priority::{
    PriorityTable, PriorityTier, RawPriority, UnixNiceTable, WindowsPriorityTable,
};

#[test]
fn test_nice_extremes() {
    assert_eq!(UnixNiceTable.tier(RawPriority::Nice(-20)), PriorityTier::High);
    assert_eq!(UnixNiceTable.tier(RawPriority::Nice(0)), PriorityTier::Normal);
    assert_eq!(UnixNiceTable.tier(RawPriority::Nice(19)), PriorityTier::Low);
}

#[test]
fn test_lower_nice_never_ranks_lower() {
    for nice in -20..19 {
        let more_favoured = UnixNiceTable.tier(RawPriority::Nice(nice)).rank();
        let less_favoured = UnixNiceTable.tier(RawPriority::Nice(nice + 1)).rank();
        assert!(more_favoured >= less_favoured, "nice {} vs {}", nice, nice + 1);
    }
}

#[test]
fn test_windows_classes_map_one_to_one() {
    let classes = [
        (0x40, PriorityTier::Idle),
        (0x4000, PriorityTier::BelowNormal),
        (0x20, PriorityTier::Normal),
        (0x8000, PriorityTier::AboveNormal),
        (0x80, PriorityTier::High),
        (0x100, PriorityTier::Realtime),
    ];
    for (class, tier) in classes {
        assert_eq!(WindowsPriorityTable.tier(RawPriority::Class(class)), tier);
    }
    assert_eq!(
        WindowsPriorityTable.tier(RawPriority::Class(0x1234)),
        PriorityTier::Unknown
    );
}
