use crate::error::Result;
use crate::models::session::StudySession;
use rust_xlsxwriter::*;

pub struct ExportService;

impl ExportService {
    /// Summary report: executive summary, key points, deep insight.
    pub fn generate_summary_xlsx(session: &StudySession) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Summary")?;

        let header_bg = Color::RGB(0x4F46E5); // Indigo
        let title_format = Format::new()
            .set_font_size(16)
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(header_bg)
            .set_align(FormatAlign::VerticalCenter);
        let section_format = Format::new()
            .set_bold()
            .set_font_size(12)
            .set_font_color(header_bg);
        let body_format = Format::new().set_text_wrap().set_align(FormatAlign::Top);

        worksheet.set_column_width(0, 100.0)?;
        worksheet.set_row_height(0, 32)?;

        let mut row: u32 = 0;
        worksheet.write_with_format(row, 0, "EXAMPRO AI - SYNC REPORT", &title_format)?;
        row += 1;
        worksheet.write(row, 0, session.title.as_str())?;
        row += 2;

        worksheet.write_with_format(row, 0, "EXECUTIVE SUMMARY", &section_format)?;
        row += 1;
        worksheet.write_with_format(row, 0, session.summary.as_str(), &body_format)?;
        row += 2;

        worksheet.write_with_format(row, 0, "KEY POINTS", &section_format)?;
        row += 1;
        for (i, point) in session.key_points.iter().enumerate() {
            worksheet.write_with_format(
                row,
                0,
                format!("{}. {}", i + 1, point).as_str(),
                &body_format,
            )?;
            row += 1;
        }
        row += 1;

        worksheet.write_with_format(row, 0, "DEEP INSIGHT", &section_format)?;
        row += 1;
        worksheet.write_with_format(row, 0, session.insights.as_str(), &body_format)?;

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }

    /// Assessment report: every question with options, the correct letter,
    /// and the explanation.
    pub fn generate_quiz_xlsx(session: &StudySession) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Assessment")?;

        let header_bg = Color::RGB(0x4F46E5);
        let title_format = Format::new()
            .set_font_size(16)
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(header_bg)
            .set_align(FormatAlign::VerticalCenter);
        let question_format = Format::new().set_bold().set_text_wrap();
        let option_format = Format::new().set_text_wrap();
        let answer_format = Format::new()
            .set_bold()
            .set_font_color(Color::RGB(0x10B981)); // Emerald
        let explanation_format = Format::new()
            .set_italic()
            .set_font_color(Color::RGB(0x64748B))
            .set_text_wrap();

        worksheet.set_column_width(0, 100.0)?;
        worksheet.set_row_height(0, 32)?;

        let mut row: u32 = 0;
        worksheet.write_with_format(row, 0, "EXAMPRO AI - ASSESSMENT MATRIX", &title_format)?;
        row += 1;
        worksheet.write(row, 0, session.title.as_str())?;
        row += 2;

        for (i, q) in session.questions.iter().enumerate() {
            worksheet.write_with_format(
                row,
                0,
                format!("{}. {}", i + 1, q.question).as_str(),
                &question_format,
            )?;
            row += 1;

            for (oi, opt) in q.options.iter().enumerate() {
                worksheet.write_with_format(
                    row,
                    0,
                    format!("   {}) {}", option_letter(oi), opt).as_str(),
                    &option_format,
                )?;
                row += 1;
            }

            worksheet.write_with_format(
                row,
                0,
                format!(
                    "   Correct Answer: {}",
                    option_letter(q.correct_index.max(0) as usize)
                )
                .as_str(),
                &answer_format,
            )?;
            row += 1;

            worksheet.write_with_format(
                row,
                0,
                format!("   Explanation: {}", q.explanation).as_str(),
                &explanation_format,
            )?;
            row += 2;
        }

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}

fn option_letter(index: usize) -> char {
    (b'A' + (index as u8).min(25)) as char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Question;
    use crate::models::session::SourceType;

    fn sample_session() -> StudySession {
        StudySession {
            id: Some("local_test".into()),
            user_id: "u1".into(),
            source_type: SourceType::Text,
            title: "Photosynthesis".into(),
            summary: "Plants convert light to energy.".into(),
            key_points: vec!["Chlorophyll absorbs light".into()],
            insights: "Energy flow underpins ecosystems.".into(),
            questions: vec![Question {
                question: "Where does photosynthesis occur?".into(),
                options: vec![
                    "Mitochondria".into(),
                    "Chloroplast".into(),
                    "Nucleus".into(),
                    "Ribosome".into(),
                ],
                correct_index: 1,
                explanation: "Chloroplasts contain chlorophyll.".into(),
            }],
            user_answers: None,
            score: None,
            total_marks: None,
            time_allowed: None,
            time_spent: None,
            created_at: 0,
        }
    }

    #[test]
    fn summary_workbook_is_nonempty() {
        let bytes = ExportService::generate_summary_xlsx(&sample_session()).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn quiz_workbook_is_nonempty() {
        let bytes = ExportService::generate_quiz_xlsx(&sample_session()).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn option_letters() {
        assert_eq!(option_letter(0), 'A');
        assert_eq!(option_letter(3), 'D');
    }
}
