use std::path::{Path, PathBuf};

use genpdf::{elements, style, Alignment, Element};
use image::Luma;
use qrcode::QrCode;
use sqlx::PgPool;

use crate::{
    access::context::AccessContext,
    common::error::AppError,
    db::{BranchRepository, CompanyRepository},
    models::{
        company::{Branch, Company},
        consignment::Consignment,
    },
};

const FONT_FAMILY: &str = "Roboto";

/// Everything printed on a consignment note, owned so rendering can move to
/// a blocking thread.
struct NoteData {
    company: Company,
    origin: Option<Branch>,
    destination: Option<Branch>,
    consignment: Consignment,
}

fn branch_label(branch: Option<&Branch>) -> String {
    branch
        .map(|b| format!("{} ({}), {}", b.name, b.code, b.city))
        .unwrap_or_else(|| "-".to_string())
}

fn doc_error(e: impl std::fmt::Display) -> AppError {
    AppError::DocumentError(e.to_string())
}

fn render_note(fonts_dir: &Path, data: NoteData) -> Result<Vec<u8>, AppError> {
    let NoteData {
        company,
        origin,
        destination,
        consignment: cn,
    } = data;

    let fonts = genpdf::fonts::from_files(fonts_dir, FONT_FAMILY, None).map_err(|e| {
        tracing::error!(dir = %fonts_dir.display(), error = %e, "consignment note fonts missing");
        doc_error(e)
    })?;

    let mut doc = genpdf::Document::new(fonts);
    doc.set_title(format!("Consignment Note {}", cn.cn_number));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    let bold = style::Style::new().bold();

    doc.push(elements::Paragraph::new(company.name.clone()).styled(bold.with_font_size(18)));
    if let Some(gst) = &company.gst_number {
        doc.push(elements::Paragraph::new(format!("GSTIN: {gst}")).styled(style::Style::new().with_font_size(10)));
    }
    doc.push(
        elements::Paragraph::new(format!("{} | {}", company.phone, company.email))
            .styled(style::Style::new().with_font_size(10)),
    );
    doc.push(elements::Break::new(1.5));

    doc.push(
        elements::Paragraph::new(format!("CONSIGNMENT NOTE #{}", cn.cn_number))
            .styled(bold.with_font_size(14)),
    );
    doc.push(elements::Paragraph::new(format!(
        "Booking date: {}",
        cn.booking_date.format("%d/%m/%Y")
    )));
    doc.push(elements::Paragraph::new(format!("From: {}", branch_label(origin.as_ref()))));
    doc.push(elements::Paragraph::new(format!("To: {}", branch_label(destination.as_ref()))));
    doc.push(elements::Break::new(1));

    let mut parties = elements::TableLayout::new(vec![1, 1]);
    parties.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
    parties
        .row()
        .element(elements::Paragraph::new("Consignor").styled(bold))
        .element(elements::Paragraph::new("Consignee").styled(bold))
        .push()
        .map_err(doc_error)?;
    parties
        .row()
        .element(
            elements::LinearLayout::vertical()
                .element(elements::Paragraph::new(cn.consignor_name.clone()))
                .element(elements::Paragraph::new(cn.consignor_phone.clone())),
        )
        .element(
            elements::LinearLayout::vertical()
                .element(elements::Paragraph::new(cn.consignee_name.clone()))
                .element(elements::Paragraph::new(cn.consignee_phone.clone()))
                .element(elements::Paragraph::new(
                    cn.consignee_address.clone().unwrap_or_default(),
                )),
        )
        .push()
        .map_err(doc_error)?;
    doc.push(parties);
    doc.push(elements::Break::new(1));

    let mut goods = elements::TableLayout::new(vec![4, 1, 2, 2]);
    goods.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
    goods
        .row()
        .element(elements::Paragraph::new("Description").styled(bold))
        .element(elements::Paragraph::new("Pkgs").styled(bold))
        .element(elements::Paragraph::new("Weight (kg)").styled(bold))
        .element(elements::Paragraph::new("Freight").styled(bold))
        .push()
        .map_err(doc_error)?;
    goods
        .row()
        .element(elements::Paragraph::new(cn.description.clone().unwrap_or_else(|| "-".to_string())))
        .element(elements::Paragraph::new(cn.packages.to_string()))
        .element(elements::Paragraph::new(format!("{:.3}", cn.weight_kg)))
        .element(elements::Paragraph::new(format!("{:.2}", cn.freight_amount)))
        .push()
        .map_err(doc_error)?;
    doc.push(goods);
    doc.push(elements::Break::new(1));

    let mut payment = elements::Paragraph::new(format!(
        "Payment: {} | Status: {}",
        cn.payment_mode.label(),
        cn.status
    ));
    payment.set_alignment(Alignment::Right);
    doc.push(payment.styled(bold.with_font_size(12)));
    doc.push(elements::Break::new(2));

    // The QR carries the CN number for scanning at branch counters.
    let code = QrCode::new(cn.cn_number.to_string().as_bytes()).map_err(doc_error)?;
    let qr = image::DynamicImage::ImageLuma8(code.render::<Luma<u8>>().build());
    let qr = elements::Image::from_dynamic_image(qr)
        .map_err(doc_error)?
        .with_scale(genpdf::Scale::new(0.5, 0.5));
    doc.push(qr);

    if let Some(address) = &company.address {
        doc.push(elements::Break::new(2));
        doc.push(elements::Paragraph::new(address.clone()).styled(style::Style::new().italic().with_font_size(8)));
    }

    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(doc_error)?;
    Ok(buffer)
}

#[derive(Clone)]
pub struct DocumentService {
    company_repo: CompanyRepository,
    branch_repo: BranchRepository,
    pool: PgPool,
    fonts_dir: PathBuf,
}

impl DocumentService {
    pub fn new(
        company_repo: CompanyRepository,
        branch_repo: BranchRepository,
        pool: PgPool,
        fonts_dir: PathBuf,
    ) -> Self {
        Self {
            company_repo,
            branch_repo,
            pool,
            fonts_dir,
        }
    }

    /// Printable note for a consignment the caller has already been admitted to.
    pub async fn consignment_note(
        &self,
        ctx: &AccessContext,
        consignment: Consignment,
    ) -> Result<Vec<u8>, AppError> {
        let company = self
            .company_repo
            .find_by_id(ctx.tenant_id)
            .await?
            .ok_or(AppError::NotFound("Company"))?;
        let origin = self
            .branch_repo
            .find_by_id(&self.pool, consignment.from_branch_id)
            .await?;
        let destination = match consignment.to_branch_id {
            Some(id) => self.branch_repo.find_by_id(&self.pool, id).await?,
            None => None,
        };

        let fonts_dir = self.fonts_dir.clone();
        let data = NoteData {
            company,
            origin,
            destination,
            consignment,
        };
        tokio::task::spawn_blocking(move || render_note(&fonts_dir, data))
            .await
            .map_err(|e| anyhow::anyhow!("note rendering task failed: {e}"))?
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn branch_label_formats_name_code_city() {
        let now = Utc::now();
        let branch = Branch {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Pune Hub".to_string(),
            code: "PNQ".to_string(),
            city: "Pune".to_string(),
            address: None,
            phone: None,
            is_head_office: false,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(branch_label(Some(&branch)), "Pune Hub (PNQ), Pune");
        assert_eq!(branch_label(None), "-");
    }
}
