//! One realistic schema exercising every declaration kind together.

use dynidl::{DynData, ExtensibilityKind, TypeDetail, TypeKind};
use pretty_assertions::assert_eq;

const SCHEMA: &str = r#"
// transport-level constants
const long MAX_PAYLOAD = 1 << 10;
const string VENDOR = "dynidl";

module sensors {

    enum Kind { TEMPERATURE, PRESSURE, @value(10) CUSTOM };

    typedef sequence<double, 16> Readings;

    bitmask Quality { CALIBRATED, STALE, @position(7) FAULTY };

    bitset Status {
        bitfield<3> mode;
        bitfield<1, boolean> online;
        bitfield<4>;
    };

    @annotation Unit { string symbol default "si"; };

    struct Header;

    @mutable
    struct Sample {
        @id(1) @key unsigned long sensor_id;
        Kind kind;
        @Unit(symbol = "K") double value;
        Readings history;
        string<32> label;
    };

    struct Header {
        unsigned long long stamp;
    };

    union Payload switch (Kind) {
        case TEMPERATURE: Sample single;
        case PRESSURE:    Readings batch;
        default:          octet raw[8];
    };

    module nested {
        const long LIMIT = ::MAX_PAYLOAD / 2;
    };
};
"#;

#[test]
fn the_whole_schema_parses_into_one_registry() {
    let ctx = dynidl::parse(SCHEMA);
    assert!(ctx.success(), "diagnostics: {:?}", ctx.diagnostics());
    assert_eq!(ctx.errors().count(), 0);

    // constants
    assert_eq!(ctx.find_constant("MAX_PAYLOAD"), Some(&DynData::Int32(1024)));
    assert_eq!(ctx.find_constant("VENDOR"), Some(&DynData::String8("dynidl".to_owned())));
    assert_eq!(ctx.find_constant("sensors::nested::LIMIT"), Some(&DynData::Int32(512)));

    // enum with @value override
    let kind = ctx.find_type("sensors::Kind").unwrap();
    assert_eq!(kind.literals()[2].value, 10);
    assert!(ctx.constant_is_from_enum("sensors::CUSTOM"));

    // alias of a bounded sequence
    let readings = ctx.find_type("sensors::Readings").unwrap();
    let TypeDetail::Sequence { element, bound } = readings.referent().unwrap().detail() else {
        panic!("expected a sequence referent");
    };
    assert_eq!(element.kind(), TypeKind::Float64);
    assert_eq!(*bound, Some(16));

    // bitmask with a moved position
    let quality = ctx.find_type("sensors::Quality").unwrap();
    assert_eq!(quality.flags()[2].position, 7);

    // bitset with padding
    let status = ctx.find_type("sensors::Status").unwrap();
    assert_eq!(status.bitfields().len(), 3);
    assert_eq!(status.bitfields()[2].name, None);

    // the annotated struct
    let sample = ctx.find_type("sensors::Sample").unwrap();
    assert_eq!(sample.extensibility(), ExtensibilityKind::Mutable);
    let sensor_id = sample.member("sensor_id").unwrap();
    assert_eq!(sensor_id.id(), 1);
    assert!(sensor_id.is_key());
    let value = sample.member("value").unwrap();
    let unit = value.annotations().iter().find(|a| a.name() == "Unit").unwrap();
    assert_eq!(unit.value("symbol"), Some(&DynData::String8("K".to_owned())));

    // forward-declared struct completed later
    let header = ctx.find_type("sensors::Header").unwrap();
    assert!(!header.is_incomplete());
    assert!(header.member("stamp").is_some());

    // union discriminated by the module-local enum
    let payload = ctx.find_type("sensors::Payload").unwrap();
    assert_eq!(payload.discriminant().unwrap().unalias().kind(), TypeKind::Enum);
    assert_eq!(payload.members()[0].labels(), &[0]);
    assert_eq!(payload.members()[1].labels(), &[1]);
    assert!(payload.members()[2].is_default_case());
    assert_eq!(payload.members()[2].member_type().kind(), TypeKind::Array);
}

#[test]
fn parsing_the_schema_twice_into_separate_contexts_is_deterministic() {
    let first = dynidl::parse(SCHEMA);
    let second = dynidl::parse(SCHEMA);
    assert!(first.success() && second.success());
    assert_eq!(
        first.find_type("sensors::Payload"),
        second.find_type("sensors::Payload")
    );
    assert_eq!(
        first.find_constant("sensors::nested::LIMIT"),
        second.find_constant("sensors::nested::LIMIT")
    );
}
