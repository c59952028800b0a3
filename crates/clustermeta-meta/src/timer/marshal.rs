//! Timer entry codecs

use super::entry::{TimerAccessEntry, TimerCreationEntry};
use super::schedule::{ScheduleExpression, TimeoutMatcher, TimerSchedule};
use crate::marshal::{
    CreationEntryProto, Marshaller, creation_from_proto, creation_to_proto, decode_message,
    duration, encode_message, millis,
};
use clustermeta_common::{Error, Result, Timestamp};
use prost::Message;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
enum ScheduleKind {
    Interval = 0,
    Calendar = 1,
}

#[derive(Clone, PartialEq, Message)]
struct CalendarProto {
    #[prost(string, tag = "1")]
    second: String,
    #[prost(string, tag = "2")]
    minute: String,
    #[prost(string, tag = "3")]
    hour: String,
    #[prost(string, tag = "4")]
    day_of_month: String,
    #[prost(string, tag = "5")]
    month: String,
    #[prost(string, tag = "6")]
    day_of_week: String,
    #[prost(string, tag = "7")]
    year: String,
    #[prost(string, optional, tag = "8")]
    zone_id: Option<String>,
    #[prost(int64, optional, tag = "9")]
    start: Option<i64>,
    #[prost(int64, optional, tag = "10")]
    end: Option<i64>,
}

#[derive(Clone, PartialEq, Message)]
struct TimeoutMatcherProto {
    #[prost(string, tag = "1")]
    declaring_class: String,
    #[prost(string, tag = "2")]
    method_name: String,
    #[prost(string, repeated, tag = "3")]
    parameter_types: Vec<String>,
}

#[derive(Clone, PartialEq, Message)]
struct TimerCreationEntryProto {
    #[prost(message, optional, tag = "1")]
    creation: Option<CreationEntryProto>,
    #[prost(enumeration = "ScheduleKind", tag = "2")]
    kind: i32,
    #[prost(int64, optional, tag = "3")]
    interval: Option<i64>,
    #[prost(message, optional, tag = "4")]
    calendar: Option<CalendarProto>,
    #[prost(message, optional, tag = "5")]
    timeout_matcher: Option<TimeoutMatcherProto>,
}

#[derive(Clone, PartialEq, Message)]
struct TimerAccessEntryProto {
    #[prost(int64, optional, tag = "1")]
    last_timeout: Option<i64>,
}

fn calendar_to_proto(expression: &ScheduleExpression) -> CalendarProto {
    CalendarProto {
        second: expression.second.clone(),
        minute: expression.minute.clone(),
        hour: expression.hour.clone(),
        day_of_month: expression.day_of_month.clone(),
        month: expression.month.clone(),
        day_of_week: expression.day_of_week.clone(),
        year: expression.year.clone(),
        zone_id: expression.zone_id.clone(),
        start: expression.start.map(|t| t.as_millis()),
        end: expression.end.map(|t| t.as_millis()),
    }
}

fn calendar_from_proto(proto: CalendarProto) -> Result<ScheduleExpression> {
    let expression = ScheduleExpression {
        second: proto.second,
        minute: proto.minute,
        hour: proto.hour,
        day_of_month: proto.day_of_month,
        month: proto.month,
        day_of_week: proto.day_of_week,
        year: proto.year,
        zone_id: proto.zone_id,
        start: proto.start.map(Timestamp::from_millis),
        end: proto.end.map(Timestamp::from_millis),
    };
    expression
        .validate()
        .map_err(|e| Error::decode(format!("stored schedule is invalid: {e}")))?;
    Ok(expression)
}

fn schedule_to_proto(schedule: &TimerSchedule, proto: &mut TimerCreationEntryProto) {
    match schedule {
        TimerSchedule::Interval { interval } => {
            proto.kind = ScheduleKind::Interval as i32;
            proto.interval = interval.map(millis);
        }
        TimerSchedule::Calendar {
            expression,
            timeout_matcher,
        } => {
            proto.kind = ScheduleKind::Calendar as i32;
            proto.calendar = Some(calendar_to_proto(expression));
            proto.timeout_matcher = timeout_matcher.as_ref().map(|matcher| TimeoutMatcherProto {
                declaring_class: matcher.declaring_class.clone(),
                method_name: matcher.method_name.clone(),
                parameter_types: matcher.parameter_types.clone(),
            });
        }
    }
}

fn schedule_from_proto(proto: &mut TimerCreationEntryProto) -> Result<TimerSchedule> {
    let kind = ScheduleKind::try_from(proto.kind)
        .map_err(|_| Error::decode(format!("unknown schedule kind {}", proto.kind)))?;

    match kind {
        ScheduleKind::Interval => {
            if proto.calendar.is_some() || proto.timeout_matcher.is_some() {
                return Err(Error::decode("interval timer carries calendar fields"));
            }
            let interval = proto.interval.map(|ms| duration("interval", ms)).transpose()?;
            if interval.is_some_and(|interval| interval.is_zero()) {
                return Err(Error::decode("zero interval"));
            }
            Ok(TimerSchedule::Interval { interval })
        }
        ScheduleKind::Calendar => {
            let calendar = proto
                .calendar
                .take()
                .ok_or_else(|| Error::decode("calendar timer without calendar"))?;
            let timeout_matcher = proto
                .timeout_matcher
                .take()
                .map(|matcher| {
                    let matcher = TimeoutMatcher {
                        declaring_class: matcher.declaring_class,
                        method_name: matcher.method_name,
                        parameter_types: matcher.parameter_types,
                    };
                    matcher
                        .validate()
                        .map(|()| matcher)
                        .map_err(|e| {
                            Error::decode(format!("stored timeout matcher is invalid: {e}"))
                        })
                })
                .transpose()?;
            Ok(TimerSchedule::Calendar {
                expression: calendar_from_proto(calendar)?,
                timeout_matcher,
            })
        }
    }
}

/// Codec for [`TimerCreationEntry`], with `M` encoding the info payload
#[derive(Clone, Debug, Default)]
pub struct TimerCreationEntryMarshaller<M> {
    context: M,
}

impl<M> TimerCreationEntryMarshaller<M> {
    pub const fn new(context: M) -> Self {
        Self { context }
    }
}

impl<C, M: Marshaller<C>> Marshaller<TimerCreationEntry<C>> for TimerCreationEntryMarshaller<M> {
    fn encode(&self, entry: &TimerCreationEntry<C>) -> Result<Vec<u8>> {
        let mut proto = TimerCreationEntryProto {
            creation: Some(creation_to_proto(&entry.creation, &self.context)?),
            ..TimerCreationEntryProto::default()
        };
        schedule_to_proto(&entry.schedule, &mut proto);
        Ok(encode_message(&proto))
    }

    fn decode(&self, bytes: &[u8]) -> Result<TimerCreationEntry<C>> {
        let mut proto: TimerCreationEntryProto = decode_message(bytes)?;
        let schedule = schedule_from_proto(&mut proto)?;
        let creation = creation_from_proto(proto.creation.unwrap_or_default(), &self.context)?;
        Ok(TimerCreationEntry::new(creation, schedule))
    }
}

/// Codec for [`TimerAccessEntry`]
#[derive(Clone, Copy, Debug, Default)]
pub struct TimerAccessEntryMarshaller;

impl Marshaller<TimerAccessEntry> for TimerAccessEntryMarshaller {
    fn encode(&self, entry: &TimerAccessEntry) -> Result<Vec<u8>> {
        Ok(encode_message(&TimerAccessEntryProto {
            last_timeout: entry.last_timeout.map(millis),
        }))
    }

    fn decode(&self, bytes: &[u8]) -> Result<TimerAccessEntry> {
        let proto: TimerAccessEntryProto = decode_message(bytes)?;
        Ok(TimerAccessEntry {
            last_timeout: proto
                .last_timeout
                .map(|ms| duration("last_timeout", ms))
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CreationEntry;
    use crate::marshal::{BincodeMarshaller, SCHEMA_VERSION};
    use std::time::Duration;

    type Creation = TimerCreationEntryMarshaller<BincodeMarshaller<Vec<String>>>;

    fn creation() -> CreationEntry<Vec<String>> {
        CreationEntry::new(Timestamp::from_millis(1_700_000_000_000))
            .with_timeout(Duration::from_secs(30))
    }

    fn calendar() -> ScheduleExpression {
        ScheduleExpression::builder()
            .second("*/10")
            .minute("*")
            .hour("9-17")
            .day_of_week("Mon-Fri")
            .zone_id("America/New_York")
            .start(Timestamp::from_millis(1_700_000_000_000))
            .end(Timestamp::from_millis(1_800_000_000_000))
            .build()
            .unwrap()
    }

    fn roundtrip(entry: &TimerCreationEntry<Vec<String>>) -> TimerCreationEntry<Vec<String>> {
        let marshaller = Creation::default();
        marshaller.decode(&marshaller.encode(entry).unwrap()).unwrap()
    }

    #[test]
    fn test_creation_roundtrip_all_shapes() {
        let matcher =
            TimeoutMatcher::new("com.acme.Reports", "nightly", ["javax.ejb.Timer"]).unwrap();
        let schedules = [
            TimerSchedule::single_action(),
            TimerSchedule::interval(Duration::from_millis(1_500)).unwrap(),
            TimerSchedule::calendar(calendar(), None),
            TimerSchedule::calendar(calendar(), Some(matcher)),
            TimerSchedule::calendar(ScheduleExpression::default(), None),
        ];

        for schedule in schedules {
            let plain = TimerCreationEntry::new(creation(), schedule.clone());
            assert_eq!(roundtrip(&plain), plain);

            let with_info = TimerCreationEntry::new(
                creation().with_context(vec!["report".to_string(), "eu".to_string()]),
                schedule,
            );
            assert_eq!(roundtrip(&with_info), with_info);
        }
    }

    #[test]
    fn test_access_roundtrip() {
        for entry in [
            TimerAccessEntry::default(),
            TimerAccessEntry::new(Some(Duration::ZERO)),
            TimerAccessEntry::new(Some(Duration::from_millis(86_400_001))),
        ] {
            let bytes = TimerAccessEntryMarshaller.encode(&entry).unwrap();
            assert_eq!(TimerAccessEntryMarshaller.decode(&bytes).unwrap(), entry);
        }
    }

    #[test]
    fn test_never_fired_differs_from_fired_at_creation() {
        let never = TimerAccessEntryMarshaller.encode(&TimerAccessEntry::default()).unwrap();
        let at_creation = TimerAccessEntryMarshaller
            .encode(&TimerAccessEntry::new(Some(Duration::ZERO)))
            .unwrap();
        assert_ne!(never, at_creation);
    }

    #[test]
    fn test_calendar_kind_without_calendar_rejected() {
        let proto = TimerCreationEntryProto {
            creation: Some(CreationEntryProto::default()),
            kind: ScheduleKind::Calendar as i32,
            ..TimerCreationEntryProto::default()
        };
        let result = Creation::default().decode(&encode_message(&proto));
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let proto = TimerCreationEntryProto {
            kind: 7,
            ..TimerCreationEntryProto::default()
        };
        let result = Creation::default().decode(&encode_message(&proto));
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_invalid_stored_calendar_rejected() {
        let mut calendar = calendar_to_proto(&calendar());
        calendar.hour = "9;17".into();
        let proto = TimerCreationEntryProto {
            creation: Some(CreationEntryProto::default()),
            kind: ScheduleKind::Calendar as i32,
            calendar: Some(calendar),
            ..TimerCreationEntryProto::default()
        };
        let result = Creation::default().decode(&encode_message(&proto));
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_older_schema_without_optional_fields() {
        // Written by a schema that only knew the creation message
        let proto = TimerCreationEntryProto {
            creation: Some(CreationEntryProto {
                creation_time: 99,
                timeout: 0,
                context: None,
            }),
            ..TimerCreationEntryProto::default()
        };
        let mut bytes = vec![SCHEMA_VERSION];
        proto.encode(&mut bytes).unwrap();

        let decoded = Creation::default().decode(&bytes).unwrap();
        assert_eq!(decoded.schedule(), &TimerSchedule::single_action());
        assert_eq!(decoded.creation().context_if_present(), None);
    }
}
