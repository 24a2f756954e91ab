use plotters::{
    prelude::{BitMapBackend, ChartBuilder, IntoDrawingArea, Rectangle},
    series::LineSeries,
    style::{Color, BLUE, RED, WHITE},
};

/// A normalized histogram of samples together with the density it should match.
pub struct DensityPlot {
    pub caption: String,
    /// Left edge of the first bin.
    pub low: f64,
    pub bin_width: f64,
    /// Empirical density of each bin.
    pub heights: Vec<f64>,
    /// `(x, pdf(x))` pairs of the analytic density.
    pub density: Vec<(f64, f64)>,
}

impl DensityPlot {
    /// Renders the plot to a PNG at `output_path`.
    pub fn render(&self, output_path: &str) -> anyhow::Result<()> {
        let high = self.low + self.bin_width * self.heights.len() as f64;
        let max_height = self
            .heights
            .iter()
            .chain(self.density.iter().map(|(_, y)| y))
            .fold(0.0_f64, |acc, &y| acc.max(y));

        let root = BitMapBackend::new(output_path, (800, 480)).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .caption(&self.caption, ("sans-serif", 32))
            .build_cartesian_2d(self.low..high, 0.0..max_height * 1.05)?;
        chart.configure_mesh().draw()?;
        chart.draw_series(self.heights.iter().enumerate().map(|(i, &h)| {
            let left = self.low + self.bin_width * i as f64;
            Rectangle::new([(left, 0.0), (left + self.bin_width, h)], BLUE.mix(0.3).filled())
        }))?;
        chart.draw_series(LineSeries::new(self.density.iter().copied(), RED))?;
        root.present()?;
        Ok(())
    }
}
