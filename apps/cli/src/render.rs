use std::fmt::Write as _;

use shared::{domain::Course, qpa::QpaSummary};

pub const HELP: &str = "\
commands:
  add                        add a course (12 units, grade A)
  rm <id>                    remove a course
  toggle <id>                include/exclude a course from the totals
  code <id> <text>           set the course code
  units <id> <n>             set the unit count (never below 0)
  inc <id> | dec <id>        add or remove one unit
  grade <id> <A|B|C|D>       set the letter grade
  move <id> <index>          move a course to a position
  move <id> before <id>      move a course in front of another
  move <id> end              move a course to the end
  list                       show courses and totals
  help                       show this text
  quit                       leave";

pub fn render_courses(courses: &[Course]) -> String {
    if courses.is_empty() {
        return "No courses added yet. Type `add` to get started.\n".to_string();
    }

    let code_width = courses
        .iter()
        .map(|course| course.code.chars().count())
        .max()
        .unwrap_or(0)
        .max("code".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<15} {:<3} {:<code_width$} {:>5}  grade",
        "#", "id", "on", "code", "units"
    );
    for (index, course) in courses.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:<15} {:<3} {:<code_width$} {:>5}  {}",
            index,
            course.id,
            if course.active { "[x]" } else { "[ ]" },
            course.code,
            course.units,
            course.grade
        );
    }
    out
}

pub fn render_totals(totals: &QpaSummary) -> String {
    format!("{totals}\n")
}
