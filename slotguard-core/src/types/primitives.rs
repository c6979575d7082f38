use serde::{Deserialize, Serialize};

pub type CollegeId = u64;
pub type StudentId = u64;
pub type CourseId = u64;
pub type SlotId = u64;
pub type EnrollmentId = u64;
/// Semesters are opaque keys such as `"Fall-2024"`.
pub type SemesterId = String;

/// Minutes in one day. Segment ends may equal this value.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Day of the week, indexed 0 (Sunday) through 6 (Saturday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Returns the numeric index used for segment comparison
    pub fn index(self) -> u8 {
        match self {
            Weekday::Sunday => 0,
            Weekday::Monday => 1,
            Weekday::Tuesday => 2,
            Weekday::Wednesday => 3,
            Weekday::Thursday => 4,
            Weekday::Friday => 5,
            Weekday::Saturday => 6,
        }
    }

    /// Inverse of [`Weekday::index`], wrapping modulo 7.
    pub fn from_index(index: u8) -> Self {
        Self::ALL[usize::from(index % 7)]
    }

    /// The following day; Saturday wraps to Sunday.
    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Canonical English name, as persisted.
    pub fn name(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A wall-clock time of day with second granularity.
///
/// Serialized as `"HH:MM:SS"`. Use [`crate::normalize::parse_clock_time`]
/// to build one from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    pub(crate) hour: u8,
    pub(crate) minute: u8,
    pub(crate) second: u8,
}

impl ClockTime {
    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    pub fn second(self) -> u8 {
        self.second
    }

    /// Minute of day, rounding any non-zero seconds up to the next minute.
    /// `23:59:30` yields [`MINUTES_PER_DAY`].
    pub fn minute_of_day(self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute) + u16::from(self.second > 0)
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = crate::error::ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        crate::normalize::parse_clock_time(&value)
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// Kinds of resources that can be leased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// All timetable slots of one course
    CourseSchedule,
    /// The enrolled schedule of one student
    StudentSchedule,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::CourseSchedule => write!(f, "course-schedule"),
            ResourceKind::StudentSchedule => write!(f, "student-schedule"),
        }
    }
}

/// A reference to a leasable resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: u64,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: u64) -> Self {
        Self { kind, id }
    }

    pub fn course_schedule(course_id: CourseId) -> Self {
        Self::new(ResourceKind::CourseSchedule, course_id)
    }

    pub fn student_schedule(student_id: StudentId) -> Self {
        Self::new(ResourceKind::StudentSchedule, student_id)
    }

    /// Creates the canonical string key for the resource (e.g. `course-schedule:42`)
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
