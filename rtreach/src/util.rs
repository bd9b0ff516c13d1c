use std::path::Path;

use csv::Writer;

use super::geometry::HyperRectangle;

fn rect_header<const NUM_DIMS: usize>() -> Vec<String> {
    let mut header = vec!["time_step".to_string()];
    for d in 0..NUM_DIMS {
        header.push(format!("min{}", d));
        header.push(format!("max{}", d));
    }
    header
}

fn rect_record<const NUM_DIMS: usize>(r: &HyperRectangle<NUM_DIMS>, record: &mut Vec<String>) {
    for d in 0..NUM_DIMS {
        record.push(format!("{}", r.dims[d].min));
        record.push(format!("{}", r.dims[d].max));
    }
}

// one row per cell, tagged with the time step offset from `start_step`
pub fn save_reachtubes_to_csv<const NUM_DIMS: usize, P: AsRef<Path>>(
    filename: P,
    start_step: usize,
    data: &[Vec<HyperRectangle<NUM_DIMS>>],
) -> csv::Result<()> {
    let mut wtr = Writer::from_path(filename)?;
    wtr.write_record(rect_header::<NUM_DIMS>())?;

    for (k, cells) in data.iter().enumerate() {
        for r in cells {
            let mut record = vec![format!("{}", start_step + k)];
            rect_record(r, &mut record);
            wtr.write_record(&record)?;
        }
    }
    wtr.flush()?;
    Ok(())
}
